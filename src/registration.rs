//! The registration surface: describe services, then build a container.
//!
//! ```
//! use forge_di::{ctor, param, ConstructedBuilder, Lifetime, Resolver, ServiceRegistry};
//! use std::sync::Arc;
//!
//! struct Database { url: String }
//! struct Repo { db: Arc<Database> }
//!
//! let mut registry = ServiceRegistry::new();
//! registry.add_literal(Database { url: "postgres://localhost".into() });
//! registry.register(
//!     ConstructedBuilder::of::<Repo>(Lifetime::Scoped)
//!         .ctor(ctor(vec![param::<Database>("db")], |args| Repo {
//!             db: args.get::<Database>(0),
//!         })),
//! );
//! let container = registry.build();
//! let scope = container.create_scope();
//! let repo = scope.get::<Repo>().unwrap();
//! assert_eq!(repo.db.url, "postgres://localhost");
//! ```

use std::any::type_name;
use std::sync::Arc;

use crate::error::DiError;
use crate::graph::{OpenGenericTemplate, ServiceGraph, SetterPolicy};
use crate::instances::constructor::{
    ConstructorSpec, CtorCandidate, DisposerFn, SetterSpec,
};
use crate::instances::{AnyArc, FactoryFn, Instance, InterceptorFn};
use crate::key::ServiceTy;
use crate::lifetime::Lifetime;
use crate::plan::ensure_planned;
use crate::provider::{Container, ExecutionMode, ScopeCtx};
use crate::traits::{AsyncDispose, AsyncDisposeAdapter, Dispose};

/// Fluent description of a constructed registration.
pub struct ConstructedBuilder {
    service: ServiceTy,
    impl_name: &'static str,
    lifetime: Lifetime,
    name: Option<&'static str>,
    default: bool,
    type_public: bool,
    candidates: Vec<CtorCandidate>,
    selected: Option<usize>,
    inline: Vec<Arc<Instance>>,
    setters: Vec<SetterSpec>,
    disposer: Option<DisposerFn>,
    interceptor: Option<InterceptorFn>,
}

impl ConstructedBuilder {
    /// A constructed registration for capability `T`, implemented by `T`
    /// itself unless [`implementation`](Self::implementation) says
    /// otherwise.
    pub fn of<T: ?Sized + 'static>(lifetime: Lifetime) -> Self {
        ConstructedBuilder {
            service: ServiceTy::of::<T>(),
            impl_name: type_name::<T>(),
            lifetime,
            name: None,
            default: false,
            type_public: true,
            candidates: Vec::new(),
            selected: None,
            inline: Vec::new(),
            setters: Vec::new(),
            disposer: None,
            interceptor: None,
        }
    }

    /// Names the implementation type for diagnostics and plan rendering.
    pub fn implementation<I: 'static>(mut self) -> Self {
        self.impl_name = type_name::<I>();
        self
    }

    /// Registers under a name instead of as the anonymous default. Named
    /// registrations are keyed: a service-key constructor parameter binds
    /// to this name.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    /// Makes this registration its family's default even though it is
    /// named.
    pub fn make_default(mut self) -> Self {
        self.default = true;
        self
    }

    /// Marks the implementation type non-public, which allows non-public
    /// constructor candidates to be considered.
    pub fn non_public(mut self) -> Self {
        self.type_public = false;
        self
    }

    /// Adds a candidate constructor.
    pub fn ctor(mut self, candidate: CtorCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Pins constructor selection to the candidate at `index`, bypassing
    /// discovery.
    pub fn select_ctor(mut self, index: usize) -> Self {
        self.selected = Some(index);
        self
    }

    /// Adds an inline literal dependency. It binds to a parameter or
    /// setter called `name` of the matching type, or to any parameter of
    /// the matching type.
    pub fn inline_literal<T: Send + Sync + 'static>(
        mut self,
        name: &'static str,
        value: T,
    ) -> Self {
        self.inline.push(Arc::new(Instance::object(
            ServiceTy::of::<T>(),
            Arc::from(name),
            false,
            Arc::new(value),
        )));
        self
    }

    /// Like [`inline_literal`](Self::inline_literal), but binds only to the
    /// parameter with exactly this name.
    pub fn inline_literal_exact<T: Send + Sync + 'static>(
        mut self,
        name: &'static str,
        value: T,
    ) -> Self {
        let mut inst = Instance::object(
            ServiceTy::of::<T>(),
            Arc::from(name),
            false,
            Arc::new(value),
        );
        inst.exact_name_only = true;
        self.inline.push(Arc::new(inst));
        self
    }

    /// Adds a constructed inline dependency, visible only to this
    /// registration's parameters and setters.
    pub fn inline_ctor(mut self, builder: ConstructedBuilder) -> Self {
        let inst = builder.build_instance_defaults();
        self.inline.push(Arc::new(inst));
        self
    }

    /// Adds a settable property.
    pub fn setter(mut self, setter: SetterSpec) -> Self {
        self.setters.push(setter);
        self
    }

    /// Runs `transform` once per construction, after setters. The
    /// transform may decorate or replace the value; whatever it returns is
    /// what gets cached and handed out.
    pub fn on_creation<T, F>(mut self, transform: F) -> Self
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&ScopeCtx<'a>, Arc<T>) -> Arc<T> + Send + Sync + 'static,
    {
        let wrapped: InterceptorFn = Arc::new(move |ctx: &ScopeCtx<'_>, value: AnyArc| {
            let typed = value
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(type_name::<T>()))?;
            let out: AnyArc = transform(ctx, typed);
            Ok(out)
        });
        self.interceptor = Some(wrapped);
        self
    }

    /// Declares that constructed values of type `T` must be released
    /// through [`Dispose`] by the scope that ends up owning them.
    pub fn dispose_sync<T: Dispose>(mut self) -> Self {
        self.disposer = Some(Arc::new(|value: &AnyArc| {
            value
                .clone()
                .downcast::<T>()
                .ok()
                .map(|v| Box::new(move || v.dispose()) as Box<dyn FnOnce() + Send>)
        }));
        self
    }

    /// Declares an [`AsyncDispose`] release contract, drained through the
    /// blocking [`AsyncDisposeAdapter`].
    pub fn dispose_async<T: AsyncDispose>(mut self) -> Self {
        self.disposer = Some(Arc::new(|value: &AnyArc| {
            value.clone().downcast::<T>().ok().map(|v| {
                let adapter = AsyncDisposeAdapter::new(v);
                Box::new(move || adapter.dispose()) as Box<dyn FnOnce() + Send>
            })
        }));
        self
    }

    /// Used while closing a template: inline dependencies substituted in by
    /// the graph.
    pub(crate) fn push_inline(&mut self, inst: Arc<Instance>) {
        self.inline.push(inst);
    }

    fn build_instance(self, name: Arc<str>, lifetime: Lifetime, keyed: bool) -> Instance {
        let spec = ConstructorSpec {
            impl_name: self.impl_name,
            type_public: self.type_public,
            candidates: self.candidates,
            selected: self.selected,
            inline: self.inline,
            setters: self.setters,
            disposer: self.disposer,
        };
        match self.interceptor {
            None => Instance::constructed(self.service, name, lifetime, keyed, spec),
            Some(transform) => {
                // The raw value is built transiently; the wrapper carries
                // the registered lifetime, so the transformed value is
                // what gets cached.
                let inner = Instance::constructed(
                    self.service,
                    name.clone(),
                    Lifetime::Transient,
                    keyed,
                    spec,
                );
                Instance::intercepted(
                    self.service,
                    name,
                    lifetime,
                    keyed,
                    Arc::new(inner),
                    transform,
                )
            }
        }
    }

    fn build_instance_defaults(self) -> Instance {
        let keyed = self.name.is_some();
        let name: Arc<str> = Arc::from(self.name.unwrap_or("default"));
        let lifetime = self.lifetime;
        self.build_instance(name, lifetime, keyed)
    }

    pub(crate) fn into_closed_instance(self, lifetime: Lifetime, name: String) -> Instance {
        self.build_instance(Arc::from(name), lifetime, false)
    }

    fn into_registration(self) -> (Instance, bool) {
        let keyed = self.name.is_some();
        let make_default = !keyed || self.default;
        (self.build_instance_defaults(), make_default)
    }
}

/// Collects registrations, then builds an immutable [`Container`].
#[derive(Default)]
pub struct ServiceRegistry {
    instances: Vec<(Instance, bool)>,
    templates: Vec<OpenGenericTemplate>,
    setter_policy: SetterPolicy,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        ServiceRegistry::default()
    }

    /// Sets the global policy for auto-discovered setter injection.
    pub fn set_setter_policy(&mut self, policy: SetterPolicy) {
        self.setter_policy = policy;
    }

    /// Registers a literal value as its type's default. Every resolution
    /// yields the same value.
    pub fn add_literal<T: Send + Sync + 'static>(&mut self, value: T) {
        self.instances.push((
            Instance::object(
                ServiceTy::of::<T>(),
                Arc::from("default"),
                false,
                Arc::new(value),
            ),
            true,
        ));
    }

    /// Registers a named literal value.
    pub fn add_named_literal<T: Send + Sync + 'static>(&mut self, name: &'static str, value: T) {
        self.instances.push((
            Instance::object(ServiceTy::of::<T>(), Arc::from(name), true, Arc::new(value)),
            false,
        ));
    }

    /// Registers a factory closure as its type's default.
    pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F)
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&ScopeCtx<'a>) -> T + Send + Sync + 'static,
    {
        let wrapped: FactoryFn = Arc::new(move |ctx: &ScopeCtx<'_>| {
            let value: AnyArc = Arc::new(factory(ctx));
            Ok(value)
        });
        self.instances.push((
            Instance::lambda(
                ServiceTy::of::<T>(),
                Arc::from("default"),
                lifetime,
                false,
                wrapped,
            ),
            true,
        ));
    }

    /// Registers a named factory closure.
    pub fn add_named_factory<T, F>(&mut self, name: &'static str, lifetime: Lifetime, factory: F)
    where
        T: Send + Sync + 'static,
        F: for<'a> Fn(&ScopeCtx<'a>) -> T + Send + Sync + 'static,
    {
        let wrapped: FactoryFn = Arc::new(move |ctx: &ScopeCtx<'_>| {
            let value: AnyArc = Arc::new(factory(ctx));
            Ok(value)
        });
        self.instances.push((
            Instance::lambda(ServiceTy::of::<T>(), Arc::from(name), lifetime, true, wrapped),
            false,
        ));
    }

    /// Registers a constructed service.
    pub fn register(&mut self, builder: ConstructedBuilder) {
        self.instances.push(builder.into_registration());
    }

    /// Registers an open-generic template.
    pub fn add_template(&mut self, template: OpenGenericTemplate) {
        self.templates.push(template);
    }

    /// Builds the container on the compiled backend.
    pub fn build(self) -> Container {
        self.build_with(ExecutionMode::Compile)
    }

    /// Builds the container on the chosen backend. Every registered
    /// instance is planned eagerly here; constructor-selection failures and
    /// unresolvable dependencies are recorded on their instance and only
    /// surface when that instance is resolved or validated.
    pub fn build_with(self, mode: ExecutionMode) -> Container {
        let mut graph = ServiceGraph::new(self.setter_policy);
        for (inst, make_default) in self.instances {
            graph.add_instance(Arc::new(inst), make_default);
        }
        for template in self.templates {
            graph.add_template(template);
        }
        for inst in graph.all_instances() {
            ensure_planned(&inst, &graph);
        }
        Container::new(graph, mode)
    }
}
