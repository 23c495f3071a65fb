//! Resolution context handed to factories and interceptors.

use crate::error::DiResult;
use crate::instances::AnyArc;
use crate::key::ServiceTy;
use crate::provider::{close_and_resolve_on, resolve_key_on, ResolutionSite};
use crate::traits::ResolverCore;

/// The resolver visible inside a factory or interceptor: it targets the
/// same scope the outer resolution targets, so anything it resolves lands
/// in the right caches and bags.
pub struct ScopeCtx<'a> {
    site: ResolutionSite<'a>,
}

impl<'a> ScopeCtx<'a> {
    pub(crate) fn new(site: &ResolutionSite<'a>) -> Self {
        ScopeCtx { site: *site }
    }
}

impl ResolverCore for ScopeCtx<'_> {
    fn resolve_key(&self, ty: ServiceTy, name: Option<&str>) -> DiResult<AnyArc> {
        resolve_key_on(&self.site, ty, name)
    }

    fn close_and_resolve(&self, family: &'static str, args: &[ServiceTy]) -> DiResult<AnyArc> {
        close_and_resolve_on(&self.site, family, args)
    }

    fn push_disposer(&self, label: String, hook: Box<dyn FnOnce() + Send>) {
        self.site.bag().lock().push(label, hook);
    }
}
