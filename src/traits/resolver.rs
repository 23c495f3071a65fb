//! Resolution traits.
//!
//! [`ResolverCore`] is the object-safe, type-erased surface implemented by
//! [`Container`](crate::Container), [`Scope`](crate::Scope) and
//! [`ScopeCtx`](crate::ScopeCtx). [`Resolver`] layers the typed convenience
//! methods on top and is blanket-implemented for every core.

use std::any::type_name;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::instances::AnyArc;
use crate::key::{service_ty, ServiceTy};
use crate::traits::{AsyncDispose, AsyncDisposeAdapter, Dispose};

/// Type-erased resolution operations.
pub trait ResolverCore {
    /// Resolves the default (or named) registration for a capability.
    fn resolve_key(&self, ty: ServiceTy, name: Option<&str>) -> DiResult<AnyArc>;

    /// Closes an open-generic family over `args` and resolves the result.
    fn close_and_resolve(&self, family: &'static str, args: &[ServiceTy]) -> DiResult<AnyArc>;

    /// Adds a release hook to the bag of the scope this resolver targets.
    fn push_disposer(&self, label: String, hook: Box<dyn FnOnce() + Send>);
}

/// Typed resolution operations, available on every [`ResolverCore`].
pub trait Resolver: ResolverCore {
    /// Resolves the default registration for `T`.
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve_key(service_ty::<T>(), None)?)
    }

    /// Resolves the registration for `T` with the given name.
    fn get_named<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        downcast::<T>(self.resolve_key(service_ty::<T>(), Some(name))?)
    }

    /// Resolves the default registration for `T`, panicking on failure.
    ///
    /// Intended for composition roots and factories where a missing
    /// registration is a programming error.
    fn get_required<T: Send + Sync + 'static>(&self) -> Arc<T> {
        match self.get::<T>() {
            Ok(value) => value,
            Err(e) => panic!("required service {} failed: {}", type_name::<T>(), e),
        }
    }

    /// Closes the open-generic `family` over `args` and resolves the closed
    /// instance as `T`.
    fn resolve_closed<T: Send + Sync + 'static>(
        &self,
        family: &'static str,
        args: &[ServiceTy],
    ) -> DiResult<Arc<T>> {
        downcast::<T>(self.close_and_resolve(family, args)?)
    }

    /// Registers a synchronous release hook for `resource` with the scope
    /// this resolver targets. Used by factories that create disposables.
    fn register_disposer<T: Dispose>(&self, resource: Arc<T>) {
        self.push_disposer(
            type_name::<T>().to_string(),
            Box::new(move || resource.dispose()),
        );
    }

    /// Registers an asynchronous release hook; drained through the blocking
    /// [`AsyncDisposeAdapter`].
    fn register_async_disposer<T: AsyncDispose>(&self, resource: Arc<T>) {
        let adapter = AsyncDisposeAdapter::new(resource);
        self.push_disposer(
            type_name::<T>().to_string(),
            Box::new(move || adapter.dispose()),
        );
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}

fn downcast<T: Send + Sync + 'static>(value: AnyArc) -> DiResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
}
