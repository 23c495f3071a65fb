//! Capability identifiers.
//!
//! A capability is the abstract type a consumer depends on. `ServiceTy`
//! pairs the `TypeId` with the human-readable type name so diagnostics can
//! say what was actually missing. Equality and hashing go through the
//! `TypeId` only, keeping lookups on the hot path cheap.

use std::any::TypeId;
use std::fmt;

/// Identifies a capability in the service graph.
#[derive(Debug, Clone, Copy)]
pub struct ServiceTy {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl ServiceTy {
    /// Captures the capability for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceTy {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The full type name of the capability.
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// True when this capability is exactly `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for ServiceTy {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceTy {}

impl std::hash::Hash for ServiceTy {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ServiceTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Shorthand for [`ServiceTy::of`].
pub fn service_ty<T: ?Sized + 'static>() -> ServiceTy {
    ServiceTy::of::<T>()
}
