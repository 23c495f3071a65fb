//! Resolution planning.
//!
//! Planning happens once, when the registry is built or a generic template
//! is closed. It selects a constructor, binds every argument and setter to
//! a concrete dependency instance, and records any failure as a plan error
//! instead of raising it; broken instances fail when resolved, not when
//! registered. Cycles found while walking dependencies become plan errors
//! rather than unbounded recursion.
//!
//! Two consumers read the finished plans: the interpreted quick path walks
//! them directly, and [`BuildPlan`] flattens them into ordered,
//! deduplicated steps for the compiled backend (and for anything that wants
//! to render or generate code from the construction order).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::graph::ServiceGraph;
use crate::instances::constructor::{ConstructorSpec, ParamSpec, Produced};
use crate::instances::{AnyArc, Instance, InstanceKind, Nothing};
use crate::lifetime::Lifetime;
use crate::provider::{ResolutionSite, ScopeCtx};

/// The per-instance resolution plan: chosen constructor, bound argument and
/// setter dependencies, and every error recorded while planning.
pub(crate) struct Plan {
    pub(crate) ctor: Option<usize>,
    pub(crate) args: Vec<Arc<Instance>>,
    /// Pairs of (setter index in the spec, bound dependency).
    pub(crate) setters: Vec<(usize, Arc<Instance>)>,
    pub(crate) errors: Vec<String>,
}

impl Plan {
    fn empty() -> Self {
        Plan {
            ctor: None,
            args: Vec::new(),
            setters: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        Plan {
            ctor: None,
            args: Vec::new(),
            setters: Vec::new(),
            errors,
        }
    }

    pub(crate) fn dependencies(&self) -> impl Iterator<Item = &Arc<Instance>> + '_ {
        self.args.iter().chain(self.setters.iter().map(|(_, d)| d))
    }
}

/// Forces the plan of `inst` and, transitively, of everything it depends
/// on. Idempotent; plans are write-once.
pub(crate) fn ensure_planned(inst: &Arc<Instance>, graph: &ServiceGraph) {
    let mut stack = Vec::new();
    ensure_planned_with(inst, graph, &mut stack);
}

fn ensure_planned_with(
    inst: &Arc<Instance>,
    graph: &ServiceGraph,
    stack: &mut Vec<(u64, &'static str)>,
) {
    if inst.plan.get().is_some() {
        return;
    }
    stack.push((inst.id, inst.service.name));
    let plan = compute_plan(inst, graph, stack);
    stack.pop();
    // A concurrent planner may have won the race; both computed the same
    // immutable data.
    let _ = inst.plan.set(plan);
}

fn compute_plan(
    inst: &Arc<Instance>,
    graph: &ServiceGraph,
    stack: &mut Vec<(u64, &'static str)>,
) -> Plan {
    match &inst.kind {
        InstanceKind::Constructed(spec) => plan_constructed(inst, spec, graph, stack),
        InstanceKind::Intercepted { inner, .. } => {
            let mut plan = Plan::empty();
            plan.args.push(inner.clone());
            plan_dependencies(&plan.args, &[], graph, stack, &mut plan.errors);
            plan
        }
        InstanceKind::Error(messages) => Plan::failed(messages.clone()),
        _ => Plan::empty(),
    }
}

fn plan_constructed(
    inst: &Arc<Instance>,
    spec: &ConstructorSpec,
    graph: &ServiceGraph,
    stack: &mut Vec<(u64, &'static str)>,
) -> Plan {
    let mut errors = Vec::new();
    let (chosen, failure) = spec.determine_constructor(inst, graph);
    if let Some(message) = failure {
        errors.push(message);
    }

    let mut args = Vec::new();
    let mut setters = Vec::new();
    if let Some(ctor_index) = chosen {
        for param in &spec.candidates[ctor_index].params {
            match determine_argument(inst, spec, param, graph) {
                Ok(dep) => args.push(dep),
                Err(message) => {
                    args.push(Arc::new(Instance::error(param.ty, vec![message.clone()])));
                    errors.push(message);
                }
            }
        }
        for (setter_index, setter) in spec.setters.iter().enumerate() {
            let found = spec.find_inline(setter.name, setter.ty).or_else(|| {
                if graph.should_be_set(setter) {
                    graph.find_default(setter.ty)
                } else {
                    None
                }
            });
            if let Some(dep) = found {
                setters.push((setter_index, dep));
            }
        }
    }

    plan_dependencies(&args, &setters, graph, stack, &mut errors);
    Plan {
        ctor: chosen,
        args,
        setters,
        errors,
    }
}

fn plan_dependencies(
    args: &[Arc<Instance>],
    setters: &[(usize, Arc<Instance>)],
    graph: &ServiceGraph,
    stack: &mut Vec<(u64, &'static str)>,
    errors: &mut Vec<String>,
) {
    let deps = args.iter().chain(setters.iter().map(|(_, d)| d));
    for dep in deps {
        if stack.iter().any(|(id, _)| *id == dep.id) {
            let mut path: Vec<&str> = stack.iter().map(|(_, name)| *name).collect();
            path.push(dep.service.name);
            errors.push(format!("circular dependency: {}", path.join(" -> ")));
        } else {
            ensure_planned_with(dep, graph, stack);
        }
    }
}

/// Binds one constructor parameter, in order: inline override, service-key
/// literal, optional default, optional graph lookup falling back to an
/// absent marker, required graph lookup.
fn determine_argument(
    inst: &Instance,
    spec: &ConstructorSpec,
    param: &ParamSpec,
    graph: &ServiceGraph,
) -> Result<Arc<Instance>, String> {
    if let Some(inline) = spec.find_inline(param.name, param.ty) {
        return Ok(inline);
    }
    if inst.keyed && param.service_key {
        let key: AnyArc = Arc::new(inst.name.to_string());
        return Ok(Arc::new(Instance::object(
            param.ty,
            Arc::from(param.name),
            false,
            key,
        )));
    }
    if param.optional {
        if let Some(default) = &param.default {
            return Ok(Arc::new(Instance::object(
                param.ty,
                Arc::from(param.name),
                false,
                default.clone(),
            )));
        }
        return Ok(graph
            .find_instance(param)
            .unwrap_or_else(|| Arc::new(Instance::null(param.ty))));
    }
    graph.find_instance(param).ok_or_else(|| {
        format!(
            "required dependency {} '{}' is not registered in this graph",
            param.ty.name, param.name
        )
    })
}

/// How a step's value is consumed within a build plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// The root value handed back to the caller.
    Build,
    /// Consumed inside a single construction, never cached.
    Inline,
    /// A dependency that outlives the construction that used it.
    Dependency,
}

/// How a step's disposal is tracked when its value is disposable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposeTracking {
    /// Not tracked here; the resolving scope decides.
    None,
    /// Released when the construction that consumed it finishes with it.
    WithUsing,
    /// Registered with the resolving scope's bag.
    RegisterWithScope,
}

/// One construction step of a [`BuildPlan`].
pub struct BuildStep {
    pub(crate) instance: Arc<Instance>,
    /// Stable, unique variable name for rendering and code generation.
    pub variable: String,
    /// Capability the step produces.
    pub service: &'static str,
    pub lifetime: Lifetime,
    pub tracking: DisposeTracking,
    /// Indices of the steps producing this step's constructor arguments.
    pub args: Vec<usize>,
    /// Indices of the steps producing this step's setter values.
    pub setters: Vec<usize>,
}

/// The ordered, deduplicated construction steps for one root instance.
///
/// Steps are dependency-ordered: every step's dependencies appear earlier
/// in the list, and the root is the final step. Each distinct instance in
/// the dependency tree appears exactly once.
pub struct BuildPlan {
    pub steps: Vec<BuildStep>,
}

impl BuildPlan {
    pub(crate) fn for_instance(root: &Arc<Instance>) -> BuildPlan {
        let mut steps = Vec::new();
        let mut index = HashMap::new();
        Self::visit(root, BuildMode::Build, true, &mut steps, &mut index);
        Self::make_names_unique(&mut steps);
        BuildPlan { steps }
    }

    /// Index of the root step (always the last).
    pub fn root_index(&self) -> usize {
        self.steps.len() - 1
    }

    fn visit(
        inst: &Arc<Instance>,
        mode: BuildMode,
        is_root: bool,
        steps: &mut Vec<BuildStep>,
        index: &mut HashMap<u64, usize>,
    ) -> usize {
        if let Some(&existing) = index.get(&inst.id) {
            return existing;
        }
        let dep_mode = if is_root && mode == BuildMode::Build {
            BuildMode::Dependency
        } else {
            mode
        };

        let (args, setters) = match (&inst.kind, inst.plan.get()) {
            // A step with recorded errors raises before touching its
            // dependencies, so they are not walked. This is also what cuts
            // dependency cycles: the planner recorded the cycle as an error
            // on one instance of the loop.
            (_, Some(plan)) if !plan.errors.is_empty() => (Vec::new(), Vec::new()),
            // The intercepted value never escapes the transform, so the
            // inner step is consumed inline.
            (InstanceKind::Intercepted { .. }, Some(plan)) => (
                plan.args
                    .iter()
                    .map(|d| Self::visit(d, BuildMode::Inline, false, steps, index))
                    .collect(),
                Vec::new(),
            ),
            (_, Some(plan)) => (
                plan.args
                    .iter()
                    .map(|d| Self::visit(d, dep_mode, false, steps, index))
                    .collect(),
                plan.setters
                    .iter()
                    .map(|(_, d)| Self::visit(d, dep_mode, false, steps, index))
                    .collect(),
            ),
            (_, None) => (Vec::new(), Vec::new()),
        };

        let step = BuildStep {
            variable: Self::variable_base(inst),
            service: inst.service.name,
            lifetime: inst.lifetime,
            tracking: Self::tracking(inst, mode),
            args,
            setters,
            instance: inst.clone(),
        };
        steps.push(step);
        let position = steps.len() - 1;
        index.insert(inst.id, position);
        position
    }

    fn tracking(inst: &Instance, mode: BuildMode) -> DisposeTracking {
        let disposable = matches!(
            &inst.kind,
            InstanceKind::Constructed(spec) if spec.disposer.is_some()
        );
        if !disposable {
            return DisposeTracking::None;
        }
        match mode {
            BuildMode::Build => DisposeTracking::None,
            BuildMode::Inline => DisposeTracking::WithUsing,
            BuildMode::Dependency => DisposeTracking::RegisterWithScope,
        }
    }

    fn variable_base(inst: &Instance) -> String {
        let raw = match &inst.kind {
            InstanceKind::Constructed(spec) => spec.impl_name,
            _ => inst.service.name,
        };
        let short = raw.rsplit("::").next().unwrap_or(raw);
        let mut variable: String = short
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();
        if variable.is_empty() || variable.starts_with(|c: char| c.is_ascii_digit()) {
            variable.insert(0, '_');
        }
        variable
    }

    fn make_names_unique(steps: &mut [BuildStep]) {
        let mut seen: HashMap<String, usize> = HashMap::new();
        for step in steps.iter_mut() {
            let count = seen.entry(step.variable.clone()).or_insert(0);
            *count += 1;
            if *count > 1 {
                step.variable = format!("{}_{}", step.variable, count);
            }
        }
    }
}

impl fmt::Display for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            let rhs = match &step.instance.kind {
                InstanceKind::Constructed(spec) => {
                    let args: Vec<&str> = step
                        .args
                        .iter()
                        .map(|&i| self.steps[i].variable.as_str())
                        .collect();
                    format!("new {}({})", spec.impl_name, args.join(", "))
                }
                InstanceKind::Object(_) => format!("value of {}", step.service),
                InstanceKind::Lambda(_) => format!("factory of {}", step.service),
                InstanceKind::Intercepted { .. } => {
                    format!("intercept({})", self.steps[step.args[0]].variable)
                }
                InstanceKind::Null => "none".to_string(),
                InstanceKind::Error(_) => "!error".to_string(),
            };
            write!(f, "{} = {}", step.variable, rhs)?;
            match step.tracking {
                DisposeTracking::None => {}
                DisposeTracking::WithUsing => write!(f, "  [guarded release]")?,
                DisposeTracking::RegisterWithScope => write!(f, "  [register with scope]")?,
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Executes a [`BuildPlan`] without touching the graph: no lookups, no
/// constructor selection, just step slots memoized per run. Cached
/// lifetimes short-circuit, so dependencies of an already-cached step are
/// never constructed.
pub(crate) struct CompiledResolver {
    plan: BuildPlan,
}

impl CompiledResolver {
    pub(crate) fn new(plan: BuildPlan) -> Self {
        CompiledResolver { plan }
    }

    pub(crate) fn run<'a>(&self, site: &ResolutionSite<'a>) -> DiResult<Produced> {
        let mut slots: Vec<Option<AnyArc>> = (0..self.plan.steps.len()).map(|_| None).collect();
        self.produce_step(self.plan.root_index(), site, &mut slots)
    }

    fn step_value<'a>(
        &self,
        index: usize,
        site: &ResolutionSite<'a>,
        slots: &mut Vec<Option<AnyArc>>,
    ) -> DiResult<AnyArc> {
        if let Some(value) = &slots[index] {
            return Ok(value.clone());
        }
        let inst = self.plan.steps[index].instance.clone();
        let value = match inst.lifetime {
            Lifetime::Transient => {
                let produced = self.produce_step(index, site, slots)?;
                site.register_disposal(&inst, produced.dispose);
                produced.value
            }
            Lifetime::Scoped => {
                site.resolve_scoped(&inst, || self.produce_step(index, site, slots))?
            }
            Lifetime::Singleton => {
                site.resolve_singleton(&inst, |root| self.produce_step(index, root, slots))?
            }
        };
        slots[index] = Some(value.clone());
        Ok(value)
    }

    fn produce_step<'a>(
        &self,
        index: usize,
        site: &ResolutionSite<'a>,
        slots: &mut Vec<Option<AnyArc>>,
    ) -> DiResult<Produced> {
        let inst = self.plan.steps[index].instance.clone();
        match &inst.kind {
            InstanceKind::Constructed(spec) => {
                let plan = match inst.plan.get() {
                    Some(plan) if plan.errors.is_empty() => plan,
                    _ => return Err(inst.configuration_error()),
                };
                let ctor_index = match plan.ctor {
                    Some(i) => i,
                    None => return Err(inst.configuration_error()),
                };
                let arg_steps = self.plan.steps[index].args.clone();
                let mut args = Vec::with_capacity(arg_steps.len());
                for step in arg_steps {
                    args.push(self.step_value(step, site, slots)?);
                }
                let setter_steps = self.plan.steps[index].setters.clone();
                let mut setters = Vec::with_capacity(setter_steps.len());
                for (position, step) in setter_steps.into_iter().enumerate() {
                    let spec_index = plan.setters[position].0;
                    setters.push((spec_index, self.step_value(step, site, slots)?));
                }
                Ok(spec.construct(ctor_index, args, &setters))
            }
            InstanceKind::Object(value) => Ok(Produced::bare(value.clone())),
            InstanceKind::Lambda(factory) => {
                factory(&ScopeCtx::new(site)).map(Produced::bare)
            }
            InstanceKind::Intercepted { transform, .. } => {
                let inner_step = self.plan.steps[index].args[0];
                let inner = self.step_value(inner_step, site, slots)?;
                transform(&ScopeCtx::new(site), inner).map(Produced::bare)
            }
            InstanceKind::Null => Ok(Produced::bare(Arc::new(Nothing))),
            InstanceKind::Error(_) => Err(inst.configuration_error()),
        }
    }
}
