use forge_di::{
    ctor, param, AssertMode, ConstructedBuilder, DiError, Lifetime, Resolver, ServiceRegistry,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn valid_configuration_passes_both_modes() {
    struct Database;
    struct Repo {
        _db: Arc<Database>,
    }

    let mut registry = ServiceRegistry::new();
    registry.add_literal(Database);
    registry.register(
        ConstructedBuilder::of::<Repo>(Lifetime::Transient).ctor(ctor(
            vec![param::<Database>("db")],
            |args| Repo {
                _db: args.get::<Database>(0),
            },
        )),
    );

    let container = registry.build();
    container
        .assert_configuration_is_valid(AssertMode::BuildOnly)
        .unwrap();
    container
        .assert_configuration_is_valid(AssertMode::Full)
        .unwrap();
}

#[test]
fn unbuildable_instance_yields_exactly_one_failure() {
    struct Missing;
    struct Broken {
        _dep: Arc<Missing>,
    }
    struct Fine;

    let mut registry = ServiceRegistry::new();
    registry.register(
        ConstructedBuilder::of::<Broken>(Lifetime::Transient).ctor(ctor(
            vec![param::<Missing>("dep")],
            |args| Broken {
                _dep: args.get::<Missing>(0),
            },
        )),
    );
    registry
        .register(ConstructedBuilder::of::<Fine>(Lifetime::Transient).ctor(ctor(vec![], |_| Fine)));

    let container = registry.build();
    let err = container
        .assert_configuration_is_valid(AssertMode::BuildOnly)
        .unwrap_err();
    match err {
        DiError::InvalidConfiguration(failures) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].contains("Broken"));
            assert!(failures[0].contains("cannot fill the dependencies"));
        }
        other => panic!("expected invalid configuration, got {other}"),
    }
}

#[test]
fn build_only_never_constructs_anything() {
    struct Probe;

    let built = Arc::new(AtomicUsize::new(0));
    let mut registry = ServiceRegistry::new();
    let built_clone = built.clone();
    registry.add_factory::<Probe, _>(Lifetime::Transient, move |_| {
        built_clone.fetch_add(1, Ordering::SeqCst);
        Probe
    });

    let container = registry.build();
    container
        .assert_configuration_is_valid(AssertMode::BuildOnly)
        .unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 0);

    container
        .assert_configuration_is_valid(AssertMode::Full)
        .unwrap();
    assert!(built.load(Ordering::SeqCst) > 0);
}

#[test]
fn full_mode_disposes_what_it_instantiated() {
    use forge_di::Dispose;
    use std::sync::Mutex;

    struct Resource {
        log: Arc<Mutex<Vec<&'static str>>>,
    }
    impl Dispose for Resource {
        fn dispose(&self) {
            self.log.lock().unwrap().push("released");
        }
    }

    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ServiceRegistry::new();
    let log_clone = log.clone();
    registry.register(
        ConstructedBuilder::of::<Resource>(Lifetime::Scoped)
            .ctor(ctor(vec![], move |_| Resource {
                log: log_clone.clone(),
            }))
            .dispose_sync::<Resource>(),
    );

    let container = registry.build();
    container
        .assert_configuration_is_valid(AssertMode::Full)
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["released"]);
}

#[test]
fn cycles_are_reported_as_configuration_errors() {
    #[derive(Debug)]
    struct Chicken {
        _egg: Arc<Egg>,
    }
    #[derive(Debug)]
    struct Egg {
        _chicken: Arc<Chicken>,
    }

    let mut registry = ServiceRegistry::new();
    registry.register(
        ConstructedBuilder::of::<Chicken>(Lifetime::Transient).ctor(ctor(
            vec![param::<Egg>("egg")],
            |args| Chicken {
                _egg: args.get::<Egg>(0),
            },
        )),
    );
    registry.register(
        ConstructedBuilder::of::<Egg>(Lifetime::Transient).ctor(ctor(
            vec![param::<Chicken>("chicken")],
            |args| Egg {
                _chicken: args.get::<Chicken>(0),
            },
        )),
    );

    // Registration survives; the cycle is a recorded error, not a hang.
    let container = registry.build();
    let err = container
        .assert_configuration_is_valid(AssertMode::BuildOnly)
        .unwrap_err();
    match err {
        DiError::InvalidConfiguration(failures) => {
            assert!(failures
                .iter()
                .any(|f| f.contains("circular dependency")));
        }
        other => panic!("expected invalid configuration, got {other}"),
    }

    let err = container.get::<Chicken>().unwrap_err();
    assert!(matches!(err, DiError::Configuration { .. }));
}
