use forge_di::{ctor, param, ConstructedBuilder, Lifetime, Resolver, ServiceRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn transient_builds_fresh_value_per_resolution() {
    struct Widget {
        serial: usize,
    }

    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let counter_clone = counter.clone();
    registry.add_factory::<Widget, _>(Lifetime::Transient, move |_| Widget {
        serial: counter_clone.fetch_add(1, Ordering::SeqCst),
    });

    let container = registry.build();
    let a = container.get::<Widget>().unwrap();
    let b = container.get::<Widget>().unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(a.serial, b.serial);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn scoped_caches_per_scope() {
    struct RequestId(usize);

    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let counter_clone = counter.clone();
    registry.add_factory::<RequestId, _>(Lifetime::Scoped, move |_| {
        RequestId(counter_clone.fetch_add(1, Ordering::SeqCst))
    });

    let container = registry.build();
    let scope1 = container.create_scope();
    let scope2 = container.create_scope();

    let a = scope1.get::<RequestId>().unwrap();
    let b = scope1.get::<RequestId>().unwrap();
    let c = scope2.get::<RequestId>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn singleton_shared_across_scopes() {
    struct Connection {
        id: usize,
    }

    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let counter_clone = counter.clone();
    registry.add_factory::<Connection, _>(Lifetime::Singleton, move |_| Connection {
        id: counter_clone.fetch_add(1, Ordering::SeqCst),
    });

    let container = registry.build();
    let scope1 = container.create_scope();
    let scope2 = container.create_scope();

    let a = container.get::<Connection>().unwrap();
    let b = scope1.get::<Connection>().unwrap();
    let c = scope2.get::<Connection>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(a.id, 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn literal_always_resolves_to_the_registered_value() {
    struct Settings {
        url: String,
    }

    let mut registry = ServiceRegistry::new();
    registry.add_literal(Settings {
        url: "amqp://broker".to_string(),
    });

    let container = registry.build();
    let scope = container.create_scope();
    let a = container.get::<Settings>().unwrap();
    let b = scope.get::<Settings>().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.url, "amqp://broker");
}

#[test]
fn named_registrations_resolve_by_name() {
    struct Endpoint {
        host: &'static str,
    }

    let mut registry = ServiceRegistry::new();
    registry.add_named_literal("primary", Endpoint { host: "db1" });
    registry.add_named_literal("replica", Endpoint { host: "db2" });

    let container = registry.build();
    let primary = container.get_named::<Endpoint>("primary").unwrap();
    let replica = container.get_named::<Endpoint>("replica").unwrap();

    assert_eq!(primary.host, "db1");
    assert_eq!(replica.host, "db2");
    // First registration of a family is the default.
    assert_eq!(container.get::<Endpoint>().unwrap().host, "db1");
}

#[test]
fn make_default_promotes_a_named_registration() {
    struct Cache {
        kind: &'static str,
    }

    let mut registry = ServiceRegistry::new();
    registry.add_named_literal("memory", Cache { kind: "memory" });
    registry.register(
        ConstructedBuilder::of::<Cache>(Lifetime::Singleton)
            .named("redis")
            .make_default()
            .ctor(ctor(vec![], |_| Cache { kind: "redis" })),
    );

    let container = registry.build();
    assert_eq!(container.get::<Cache>().unwrap().kind, "redis");
    assert_eq!(container.get_named::<Cache>("memory").unwrap().kind, "memory");
}

#[test]
fn singleton_dependencies_resolve_against_the_root() {
    // A singleton's scoped dependency must come from the root cache, not
    // from whichever scope happened to trigger construction.
    struct Tracker {
        stamp: usize,
    }
    struct Hub {
        tracker: Arc<Tracker>,
    }

    let counter = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let counter_clone = counter.clone();
    registry.add_factory::<Tracker, _>(Lifetime::Scoped, move |_| Tracker {
        stamp: counter_clone.fetch_add(1, Ordering::SeqCst),
    });
    registry.register(
        ConstructedBuilder::of::<Hub>(Lifetime::Singleton).ctor(ctor(
            vec![param::<Tracker>("tracker")],
            |args| Hub {
                tracker: args.get::<Tracker>(0),
            },
        )),
    );

    let container = registry.build();
    let scope = container.create_scope();
    let hub = scope.get::<Hub>().unwrap();
    let scope_tracker = scope.get::<Tracker>().unwrap();
    let root_tracker = container.get::<Tracker>().unwrap();

    assert!(!Arc::ptr_eq(&hub.tracker, &scope_tracker));
    assert!(Arc::ptr_eq(&hub.tracker, &root_tracker));
    assert_eq!(hub.tracker.stamp, root_tracker.stamp);
}
