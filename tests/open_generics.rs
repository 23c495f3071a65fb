use forge_di::{
    ctor, param, service_ty, Args, ConstructedBuilder, DiError, Lifetime, OpenGenericTemplate,
    Resolver, ServiceRegistry,
};
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Debug)]
struct RepoOf<T> {
    label: String,
    _marker: PhantomData<T>,
}

fn repo_template() -> OpenGenericTemplate {
    OpenGenericTemplate::new("repository", Lifetime::Singleton, |args| match args {
        [arg] if arg.is::<i32>() => Some(
            ConstructedBuilder::of::<RepoOf<i32>>(Lifetime::Singleton).ctor(ctor(
                vec![],
                |_| RepoOf::<i32> {
                    label: "repo<i32>".to_string(),
                    _marker: PhantomData,
                },
            )),
        ),
        [arg] if arg.is::<String>() => Some(
            ConstructedBuilder::of::<RepoOf<String>>(Lifetime::Singleton).ctor(ctor(
                vec![],
                |_| RepoOf::<String> {
                    label: "repo<String>".to_string(),
                    _marker: PhantomData,
                },
            )),
        ),
        _ => None,
    })
}

#[test]
fn closing_substitutes_each_argument_independently() {
    let mut registry = ServiceRegistry::new();
    registry.add_template(repo_template());
    let container = registry.build();

    let ints = container
        .resolve_closed::<RepoOf<i32>>("repository", &[service_ty::<i32>()])
        .unwrap();
    let strings = container
        .resolve_closed::<RepoOf<String>>("repository", &[service_ty::<String>()])
        .unwrap();

    assert_eq!(ints.label, "repo<i32>");
    assert_eq!(strings.label, "repo<String>");
}

#[test]
fn closing_the_same_arguments_reuses_the_same_instance() {
    let mut registry = ServiceRegistry::new();
    registry.add_template(repo_template());
    let container = registry.build();
    let scope = container.create_scope();

    let a = container
        .resolve_closed::<RepoOf<i32>>("repository", &[service_ty::<i32>()])
        .unwrap();
    let b = scope
        .resolve_closed::<RepoOf<i32>>("repository", &[service_ty::<i32>()])
        .unwrap();

    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn unclosable_arguments_are_a_miss_not_a_fault() {
    let mut registry = ServiceRegistry::new();
    registry.add_template(repo_template());
    let container = registry.build();

    let err = container
        .resolve_closed::<RepoOf<bool>>("repository", &[service_ty::<bool>()])
        .unwrap_err();
    assert!(matches!(err, DiError::NotFound("repository")));

    let err = container
        .resolve_closed::<RepoOf<i32>>("no-such-family", &[service_ty::<i32>()])
        .unwrap_err();
    assert!(matches!(err, DiError::NotFound("no-such-family")));
}

#[test]
fn closing_does_not_register_the_capability_globally() {
    let mut registry = ServiceRegistry::new();
    registry.add_template(repo_template());
    let container = registry.build();

    let _closed = container
        .resolve_closed::<RepoOf<i32>>("repository", &[service_ty::<i32>()])
        .unwrap();

    // The closing is reachable through the family, not through plain
    // capability lookup.
    assert!(container.get::<RepoOf<i32>>().is_err());
}

#[test]
fn open_inline_dependencies_close_with_the_same_arguments() {
    struct UowOf<T> {
        label: String,
        _marker: PhantomData<T>,
    }
    struct TrackedRepo<T> {
        uow: Arc<UowOf<T>>,
        _marker: PhantomData<T>,
    }

    let uow_template = OpenGenericTemplate::new("unit-of-work", Lifetime::Singleton, |args| {
        match args {
            [arg] if arg.is::<i32>() => Some(
                ConstructedBuilder::of::<UowOf<i32>>(Lifetime::Singleton).ctor(ctor(
                    vec![],
                    |_| UowOf::<i32> {
                        label: "uow<i32>".to_string(),
                        _marker: PhantomData,
                    },
                )),
            ),
            [arg] if arg.is::<String>() => Some(
                ConstructedBuilder::of::<UowOf<String>>(Lifetime::Singleton).ctor(ctor(
                    vec![],
                    |_| UowOf::<String> {
                        label: "uow<String>".to_string(),
                        _marker: PhantomData,
                    },
                )),
            ),
            _ => None,
        }
    });

    let repo_template = OpenGenericTemplate::new("tracked-repo", Lifetime::Singleton, |args| {
        match args {
            [arg] if arg.is::<i32>() => Some(
                ConstructedBuilder::of::<TrackedRepo<i32>>(Lifetime::Singleton).ctor(ctor(
                    vec![param::<UowOf<i32>>("uow")],
                    |args: &Args| TrackedRepo::<i32> {
                        uow: args.get::<UowOf<i32>>(0),
                        _marker: PhantomData,
                    },
                )),
            ),
            [arg] if arg.is::<String>() => Some(
                ConstructedBuilder::of::<TrackedRepo<String>>(Lifetime::Singleton).ctor(ctor(
                    vec![param::<UowOf<String>>("uow")],
                    |args: &Args| TrackedRepo::<String> {
                        uow: args.get::<UowOf<String>>(0),
                        _marker: PhantomData,
                    },
                )),
            ),
            _ => None,
        }
    })
    .inline_open("unit-of-work");

    let mut registry = ServiceRegistry::new();
    registry.add_template(uow_template);
    registry.add_template(repo_template);
    let container = registry.build();

    let ints = container
        .resolve_closed::<TrackedRepo<i32>>("tracked-repo", &[service_ty::<i32>()])
        .unwrap();
    let strings = container
        .resolve_closed::<TrackedRepo<String>>("tracked-repo", &[service_ty::<String>()])
        .unwrap();

    assert_eq!(ints.uow.label, "uow<i32>");
    assert_eq!(strings.uow.label, "uow<String>");
}
