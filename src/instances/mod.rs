//! The instance model: one `Instance` per registered (capability, name)
//! pair, carrying everything needed to produce a value.
//!
//! An instance's resolution plan is computed exactly once when the registry
//! is built (or when a generic template is closed) and stored in a
//! write-once cell; after that, resolution on either backend only reads
//! immutable data.

pub mod constructor;

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::key::ServiceTy;
use crate::lifetime::Lifetime;
use crate::plan::Plan;
use crate::provider::ScopeCtx;

use constructor::ConstructorSpec;

/// Type-erased, shareable service value.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Marker value stored when an optional dependency resolves to nothing.
/// [`Args::opt`](constructor::Args::opt) translates it back to `None`.
pub(crate) struct Nothing;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_instance_id() -> u64 {
    NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Factory closure for lambda registrations.
pub(crate) type FactoryFn =
    Arc<dyn for<'a> Fn(&ScopeCtx<'a>) -> DiResult<AnyArc> + Send + Sync>;

/// Creation interceptor. May decorate or replace the freshly built value.
pub(crate) type InterceptorFn =
    Arc<dyn for<'a> Fn(&ScopeCtx<'a>, AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// How an instance produces its value.
pub(crate) enum InstanceKind {
    /// Built by invoking a selected constructor over resolved arguments.
    Constructed(ConstructorSpec),
    /// A literal value supplied at registration time.
    Object(AnyArc),
    /// A user factory closure.
    Lambda(FactoryFn),
    /// Wraps another instance; the transform runs once per construction.
    Intercepted {
        inner: Arc<Instance>,
        transform: InterceptorFn,
    },
    /// Absent optional dependency. Produces the [`Nothing`] marker.
    Null,
    /// Planning failed at registration time; resolving raises the messages.
    Error(Vec<String>),
}

/// A single resolvable registration.
pub struct Instance {
    pub(crate) id: u64,
    pub(crate) service: ServiceTy,
    pub(crate) name: Arc<str>,
    pub(crate) lifetime: Lifetime,
    /// Registered under an explicit name; enables key-marker parameters.
    pub(crate) keyed: bool,
    /// As an inline dependency, match only on exact parameter name.
    pub(crate) exact_name_only: bool,
    pub(crate) kind: InstanceKind,
    pub(crate) plan: OnceCell<Plan>,
    /// Serializes first construction of a singleton.
    pub(crate) singleton_lock: Mutex<()>,
}

impl Instance {
    fn new(
        service: ServiceTy,
        name: Arc<str>,
        lifetime: Lifetime,
        keyed: bool,
        kind: InstanceKind,
    ) -> Self {
        Instance {
            id: next_instance_id(),
            service,
            name,
            lifetime,
            keyed,
            exact_name_only: false,
            kind,
            plan: OnceCell::new(),
            singleton_lock: Mutex::new(()),
        }
    }

    pub(crate) fn constructed(
        service: ServiceTy,
        name: Arc<str>,
        lifetime: Lifetime,
        keyed: bool,
        spec: ConstructorSpec,
    ) -> Self {
        Instance::new(service, name, lifetime, keyed, InstanceKind::Constructed(spec))
    }

    /// Literal values are handed out as-is, so Transient with no caching
    /// still yields the same `Arc` on every resolution.
    pub(crate) fn object(service: ServiceTy, name: Arc<str>, keyed: bool, value: AnyArc) -> Self {
        Instance::new(service, name, Lifetime::Transient, keyed, InstanceKind::Object(value))
    }

    pub(crate) fn lambda(
        service: ServiceTy,
        name: Arc<str>,
        lifetime: Lifetime,
        keyed: bool,
        factory: FactoryFn,
    ) -> Self {
        Instance::new(service, name, lifetime, keyed, InstanceKind::Lambda(factory))
    }

    pub(crate) fn null(service: ServiceTy) -> Self {
        Instance::new(
            service,
            Arc::from("none"),
            Lifetime::Transient,
            false,
            InstanceKind::Null,
        )
    }

    /// Placeholder bound where planning failed; resolving it raises the
    /// recorded messages.
    pub(crate) fn error(service: ServiceTy, messages: Vec<String>) -> Self {
        Instance::new(
            service,
            Arc::from("error"),
            Lifetime::Transient,
            false,
            InstanceKind::Error(messages),
        )
    }

    pub(crate) fn intercepted(
        service: ServiceTy,
        name: Arc<str>,
        lifetime: Lifetime,
        keyed: bool,
        inner: Arc<Instance>,
        transform: InterceptorFn,
    ) -> Self {
        Instance::new(
            service,
            name,
            lifetime,
            keyed,
            InstanceKind::Intercepted { inner, transform },
        )
    }

    /// The capability this instance satisfies.
    pub fn service(&self) -> ServiceTy {
        self.service
    }

    /// The registration name ("default" when unnamed).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Label used in disposal bags and error messages.
    pub(crate) fn label(&self) -> String {
        format!("{} ({})", self.service.name, self.name)
    }

    /// The configuration error raised when this instance cannot be built.
    pub(crate) fn configuration_error(&self) -> DiError {
        let messages = match (&self.kind, self.plan.get()) {
            (InstanceKind::Error(messages), _) => messages.clone(),
            (_, Some(plan)) if !plan.errors.is_empty() => plan.errors.clone(),
            _ => vec!["resolution plan was never built".to_string()],
        };
        DiError::Configuration {
            instance: self.label(),
            messages,
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("service", &self.service.name)
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}
