use forge_di::{ctor, ConstructedBuilder, Lifetime, Resolver, ServiceRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Greeter {
    greeting: String,
}

#[test]
fn interceptor_may_replace_the_value() {
    let mut registry = ServiceRegistry::new();
    registry.register(
        ConstructedBuilder::of::<Greeter>(Lifetime::Transient)
            .ctor(ctor(vec![], |_| Greeter {
                greeting: "hello".to_string(),
            }))
            .on_creation::<Greeter, _>(|_, raw| {
                Arc::new(Greeter {
                    greeting: format!("{}, world", raw.greeting),
                })
            }),
    );

    let container = registry.build();
    assert_eq!(container.get::<Greeter>().unwrap().greeting, "hello, world");
}

#[test]
fn interceptor_runs_once_per_construction() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let runs_clone = runs.clone();
    registry.register(
        ConstructedBuilder::of::<Greeter>(Lifetime::Singleton)
            .ctor(ctor(vec![], |_| Greeter {
                greeting: "hello".to_string(),
            }))
            .on_creation::<Greeter, _>(move |_, raw| {
                runs_clone.fetch_add(1, Ordering::SeqCst);
                raw
            }),
    );

    let container = registry.build();
    let scope = container.create_scope();
    let a = container.get::<Greeter>().unwrap();
    let b = scope.get::<Greeter>().unwrap();
    let c = container.get::<Greeter>().unwrap();

    // The singleton was constructed once, so the transform ran once; every
    // resolution observes the transformed value.
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
}

#[test]
fn transient_interceptor_runs_per_resolution() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let runs_clone = runs.clone();
    registry.register(
        ConstructedBuilder::of::<Greeter>(Lifetime::Transient)
            .ctor(ctor(vec![], |_| Greeter {
                greeting: "hey".to_string(),
            }))
            .on_creation::<Greeter, _>(move |_, raw| {
                runs_clone.fetch_add(1, Ordering::SeqCst);
                raw
            }),
    );

    let container = registry.build();
    let _a = container.get::<Greeter>().unwrap();
    let _b = container.get::<Greeter>().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn interceptor_can_resolve_collaborators() {
    struct Prefix(String);

    let mut registry = ServiceRegistry::new();
    registry.add_literal(Prefix("api".to_string()));
    registry.register(
        ConstructedBuilder::of::<Greeter>(Lifetime::Transient)
            .ctor(ctor(vec![], |_| Greeter {
                greeting: "hello".to_string(),
            }))
            .on_creation::<Greeter, _>(|ctx, raw| {
                let prefix = ctx.get_required::<Prefix>();
                Arc::new(Greeter {
                    greeting: format!("[{}] {}", prefix.0, raw.greeting),
                })
            }),
    );

    let container = registry.build();
    assert_eq!(container.get::<Greeter>().unwrap().greeting, "[api] hello");
}
