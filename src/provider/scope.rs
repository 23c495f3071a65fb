//! Child scopes.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::instances::AnyArc;
use crate::internal::DisposeBag;
use crate::key::ServiceTy;
use crate::provider::{close_and_resolve_on, resolve_key_on, Container, ResolutionSite};
use crate::traits::ResolverCore;

/// A node in the scope tree. Holds its own cache of scoped values and its
/// own bag of release hooks; disposing it never touches an ancestor or a
/// sibling.
pub struct Scope {
    container: Container,
    cache: Mutex<HashMap<u64, AnyArc>>,
    disposables: Mutex<DisposeBag>,
}

impl Scope {
    pub(crate) fn new(container: Container) -> Self {
        Scope {
            container,
            cache: Mutex::new(HashMap::new()),
            disposables: Mutex::new(DisposeBag::default()),
        }
    }

    pub(crate) fn container(&self) -> &Container {
        &self.container
    }

    pub(crate) fn cache(&self) -> &Mutex<HashMap<u64, AnyArc>> {
        &self.cache
    }

    pub(crate) fn disposables(&self) -> &Mutex<DisposeBag> {
        &self.disposables
    }

    /// Creates a sibling-independent child of the same container.
    pub fn create_child(&self) -> Scope {
        self.container.create_scope()
    }

    /// Releases everything this scope owns exactly once, newest first.
    /// A second call is a no-op. Hooks that panic are collected and
    /// surfaced together after the rest have run.
    pub fn dispose(&self) -> DiResult<()> {
        let failures = self.disposables.lock().drain_all();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::Disposal(failures))
        }
    }
}

impl ResolverCore for Scope {
    fn resolve_key(&self, ty: ServiceTy, name: Option<&str>) -> DiResult<AnyArc> {
        resolve_key_on(&ResolutionSite::for_scope(self), ty, name)
    }

    fn close_and_resolve(&self, family: &'static str, args: &[ServiceTy]) -> DiResult<AnyArc> {
        close_and_resolve_on(&ResolutionSite::for_scope(self), family, args)
    }

    fn push_disposer(&self, label: String, hook: Box<dyn FnOnce() + Send>) {
        self.disposables.lock().push(label, hook);
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        let bag = self.disposables.get_mut();
        if !bag.is_empty() {
            eprintln!(
                "forge-di: scope dropped with {} undisposed resource(s); call dispose() first",
                bag.len()
            );
        }
    }
}
