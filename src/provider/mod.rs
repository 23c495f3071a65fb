//! The container and its resolution machinery.
//!
//! A [`Container`] is the root scope: it owns the singleton cache, the
//! root-level scoped cache and the root dispose bag. Child [`Scope`]s hold
//! their own caches and bags. All resolution funnels through a
//! [`ResolutionSite`], which pairs the container with the scope (if any)
//! the request targets, so singleton construction can be re-aimed at the
//! root no matter where the request started.

mod context;
mod scope;

pub use context::ScopeCtx;
pub use scope::Scope;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{DiError, DiResult};
use crate::graph::ServiceGraph;
use crate::instances::constructor::Produced;
use crate::instances::{AnyArc, Instance, InstanceKind, Nothing};
use crate::internal::DisposeBag;
use crate::key::{service_ty, ServiceTy};
use crate::lifetime::Lifetime;
use crate::plan::{BuildPlan, CompiledResolver};
use crate::traits::ResolverCore;

/// Which backend serves resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Walk each instance's plan directly on every request.
    Interpret,
    /// Run precompiled build plans; no graph lookups at request time.
    Compile,
}

pub(crate) struct ContainerInner {
    pub(crate) graph: ServiceGraph,
    pub(crate) mode: ExecutionMode,
    /// Compiled resolvers by instance id. Closed generics compile in
    /// lazily, hence the RwLock.
    resolvers: RwLock<HashMap<u64, Arc<CompiledResolver>>>,
    singletons: Mutex<HashMap<u64, AnyArc>>,
    root_scoped: Mutex<HashMap<u64, AnyArc>>,
    root_disposables: Mutex<DisposeBag>,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let bag = self.root_disposables.get_mut();
        if !bag.is_empty() {
            eprintln!(
                "forge-di: container dropped with {} undisposed resource(s); call dispose() first",
                bag.len()
            );
        }
    }
}

/// The root of a scope tree. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub(crate) fn new(graph: ServiceGraph, mode: ExecutionMode) -> Self {
        let mut resolvers = HashMap::new();
        if mode == ExecutionMode::Compile {
            for inst in graph.all_instances() {
                resolvers.insert(
                    inst.id,
                    Arc::new(CompiledResolver::new(BuildPlan::for_instance(&inst))),
                );
            }
        }
        Container {
            inner: Arc::new(ContainerInner {
                graph,
                mode,
                resolvers: RwLock::new(resolvers),
                singletons: Mutex::new(HashMap::new()),
                root_scoped: Mutex::new(HashMap::new()),
                root_disposables: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    pub(crate) fn inner(&self) -> &ContainerInner {
        &self.inner
    }

    /// Creates a child scope with its own cache and dispose bag.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// Releases every root-owned resource exactly once, newest first.
    /// Hooks that panic are collected and surfaced together.
    pub fn dispose(&self) -> DiResult<()> {
        let failures = self.inner.root_disposables.lock().drain_all();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::Disposal(failures))
        }
    }

    /// The build plan for the default registration of `T`, if any: the
    /// ordered construction steps a code generator would consume.
    pub fn plan_for<T: Send + Sync + 'static>(&self) -> Option<BuildPlan> {
        self.inner
            .graph
            .find_default(service_ty::<T>())
            .map(|inst| BuildPlan::for_instance(&inst))
    }
}

impl ResolverCore for Container {
    fn resolve_key(&self, ty: ServiceTy, name: Option<&str>) -> DiResult<AnyArc> {
        resolve_key_on(&ResolutionSite::root(self), ty, name)
    }

    fn close_and_resolve(&self, family: &'static str, args: &[ServiceTy]) -> DiResult<AnyArc> {
        close_and_resolve_on(&ResolutionSite::root(self), family, args)
    }

    fn push_disposer(&self, label: String, hook: Box<dyn FnOnce() + Send>) {
        self.inner.root_disposables.lock().push(label, hook);
    }
}

/// Where a resolution is happening: the container plus the scope (if any)
/// whose caches and bag the request targets.
#[derive(Clone, Copy)]
pub(crate) struct ResolutionSite<'a> {
    pub(crate) container: &'a Container,
    pub(crate) scope: Option<&'a Scope>,
}

impl<'a> ResolutionSite<'a> {
    pub(crate) fn root(container: &'a Container) -> Self {
        ResolutionSite {
            container,
            scope: None,
        }
    }

    pub(crate) fn for_scope(scope: &'a Scope) -> Self {
        ResolutionSite {
            container: scope.container(),
            scope: Some(scope),
        }
    }

    /// The same container, seen from the root scope. Singleton construction
    /// happens here so everything a singleton owns lives at the root.
    pub(crate) fn root_site(&self) -> ResolutionSite<'a> {
        ResolutionSite {
            container: self.container,
            scope: None,
        }
    }

    fn scoped_cache(&self) -> &Mutex<HashMap<u64, AnyArc>> {
        match self.scope {
            Some(scope) => scope.cache(),
            None => &self.container.inner().root_scoped,
        }
    }

    fn bag(&self) -> &Mutex<DisposeBag> {
        match self.scope {
            Some(scope) => scope.disposables(),
            None => &self.container.inner().root_disposables,
        }
    }

    pub(crate) fn register_disposal(
        &self,
        inst: &Instance,
        hook: Option<Box<dyn FnOnce() + Send>>,
    ) {
        if let Some(hook) = hook {
            self.bag().lock().push(inst.label(), hook);
        }
    }

    /// Resolves an instance at this site, honoring its lifetime.
    pub(crate) fn resolve(&self, inst: &Arc<Instance>) -> DiResult<AnyArc> {
        match inst.lifetime {
            Lifetime::Transient => {
                let produced = self.produce(inst)?;
                self.register_disposal(inst, produced.dispose);
                Ok(produced.value)
            }
            Lifetime::Scoped => self.resolve_scoped(inst, || self.produce(inst)),
            Lifetime::Singleton => self.resolve_singleton(inst, |root| root.produce(inst)),
        }
    }

    /// Per-scope cache with atomic check-then-set. The loser of a
    /// construction race observes the winner's value; its own value and
    /// release hook are dropped, never registered.
    pub(crate) fn resolve_scoped<F>(&self, inst: &Arc<Instance>, make: F) -> DiResult<AnyArc>
    where
        F: FnOnce() -> DiResult<Produced>,
    {
        if let Some(existing) = self.scoped_cache().lock().get(&inst.id) {
            return Ok(existing.clone());
        }
        let produced = make()?;
        {
            let mut cache = self.scoped_cache().lock();
            if let Some(existing) = cache.get(&inst.id) {
                return Ok(existing.clone());
            }
            cache.insert(inst.id, produced.value.clone());
        }
        self.register_disposal(inst, produced.dispose);
        Ok(produced.value)
    }

    /// Root cache guarded by the instance's own mutex with double-checked
    /// locking, so each singleton is constructed at most once while
    /// different singletons never contend.
    pub(crate) fn resolve_singleton<F>(&self, inst: &Arc<Instance>, make: F) -> DiResult<AnyArc>
    where
        F: FnOnce(&ResolutionSite<'a>) -> DiResult<Produced>,
    {
        let inner = self.container.inner();
        if let Some(existing) = inner.singletons.lock().get(&inst.id) {
            return Ok(existing.clone());
        }
        let _guard = inst.singleton_lock.lock();
        if let Some(existing) = inner.singletons.lock().get(&inst.id) {
            return Ok(existing.clone());
        }
        let root = self.root_site();
        let produced = make(&root)?;
        inner
            .singletons
            .lock()
            .insert(inst.id, produced.value.clone());
        root.register_disposal(inst, produced.dispose);
        Ok(produced.value)
    }

    /// Produces a fresh value for the instance, via its compiled resolver
    /// when one exists, else the interpreted quick path.
    pub(crate) fn produce(&self, inst: &Arc<Instance>) -> DiResult<Produced> {
        if self.container.inner().mode == ExecutionMode::Compile {
            let resolver = self
                .container
                .inner()
                .resolvers
                .read()
                .get(&inst.id)
                .cloned();
            if let Some(resolver) = resolver {
                return resolver.run(self);
            }
        }
        self.quick_produce(inst)
    }

    /// The interpreted quick path: walk the instance's plan directly.
    pub(crate) fn quick_produce(&self, inst: &Arc<Instance>) -> DiResult<Produced> {
        match &inst.kind {
            InstanceKind::Object(value) => Ok(Produced::bare(value.clone())),
            InstanceKind::Lambda(factory) => {
                factory(&ScopeCtx::new(self)).map(Produced::bare)
            }
            InstanceKind::Null => Ok(Produced::bare(Arc::new(Nothing))),
            InstanceKind::Error(_) => Err(inst.configuration_error()),
            InstanceKind::Intercepted { inner, transform } => {
                let raw = self.resolve(inner)?;
                transform(&ScopeCtx::new(self), raw).map(Produced::bare)
            }
            InstanceKind::Constructed(spec) => {
                let plan = match inst.plan.get() {
                    Some(plan) if plan.errors.is_empty() => plan,
                    _ => return Err(inst.configuration_error()),
                };
                let ctor_index = match plan.ctor {
                    Some(i) => i,
                    None => return Err(inst.configuration_error()),
                };
                let mut args = Vec::with_capacity(plan.args.len());
                for dep in &plan.args {
                    args.push(self.resolve(dep)?);
                }
                let mut setters = Vec::with_capacity(plan.setters.len());
                for (spec_index, dep) in &plan.setters {
                    setters.push((*spec_index, self.resolve(dep)?));
                }
                Ok(spec.construct(ctor_index, args, &setters))
            }
        }
    }
}

pub(crate) fn resolve_key_on(
    site: &ResolutionSite<'_>,
    ty: ServiceTy,
    name: Option<&str>,
) -> DiResult<AnyArc> {
    let graph = &site.container.inner().graph;
    let inst = match name {
        None => graph.find_default(ty).ok_or(DiError::NotFound(ty.name))?,
        Some(name) => graph
            .find_named(ty, name)
            .ok_or_else(|| DiError::NotFoundNamed(ty.name, name.to_string()))?,
    };
    site.resolve(&inst)
}

pub(crate) fn close_and_resolve_on(
    site: &ResolutionSite<'_>,
    family: &'static str,
    args: &[ServiceTy],
) -> DiResult<AnyArc> {
    let inner = site.container.inner();
    let inst = inner
        .graph
        .close(family, args)
        .ok_or(DiError::NotFound(family))?;
    if inner.mode == ExecutionMode::Compile {
        let missing = !inner.resolvers.read().contains_key(&inst.id);
        if missing {
            inner.resolvers.write().entry(inst.id).or_insert_with(|| {
                Arc::new(CompiledResolver::new(BuildPlan::for_instance(&inst)))
            });
        }
    }
    site.resolve(&inst)
}
