//! Constructor metadata and selection.
//!
//! Candidate constructors are plain data: parameter descriptions plus a
//! type-erased invoke closure. Selection ranks candidates by descending
//! parameter count and picks the first whose parameters can all be
//! satisfied; when none can, the failure is recorded with a per-candidate
//! explanation so the eventual error says exactly what was missing.

use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

use crate::graph::ServiceGraph;
use crate::instances::{AnyArc, Instance, Nothing};
use crate::key::ServiceTy;

pub(crate) const NO_PUBLIC_CONSTRUCTORS: &str = "no public constructors";
pub(crate) const CANNOT_FILL_CONSTRUCTORS: &str =
    "cannot fill the dependencies of any of the public constructors";

/// Resolved constructor arguments, positionally aligned with the chosen
/// candidate's parameters.
pub struct Args {
    values: Vec<AnyArc>,
}

impl Args {
    pub(crate) fn new(values: Vec<AnyArc>) -> Self {
        Args { values }
    }

    /// The argument at `index`, downcast to `T`.
    ///
    /// Panics on a type mismatch; the planner guarantees positions and
    /// types line up with the candidate's parameter list.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> Arc<T> {
        self.values[index]
            .clone()
            .downcast::<T>()
            .unwrap_or_else(|_| {
                panic!("constructor argument {} is not a {}", index, type_name::<T>())
            })
    }

    /// The argument at `index` as an optional dependency. Absent optionals
    /// yield `None`.
    pub fn opt<T: Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        let value = self.values[index].clone();
        if value.downcast_ref::<Nothing>().is_some() {
            return None;
        }
        value.downcast::<T>().ok()
    }
}

/// One constructor parameter.
pub struct ParamSpec {
    pub(crate) name: &'static str,
    pub(crate) ty: ServiceTy,
    pub(crate) optional: bool,
    pub(crate) default: Option<AnyArc>,
    pub(crate) service_key: bool,
    pub(crate) simple: bool,
    pub(crate) named: Option<&'static str>,
}

impl ParamSpec {
    /// Marks the parameter optional; when unsatisfied it binds to nothing
    /// and surfaces as `None` through [`Args::opt`].
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Marks the parameter optional with a fallback literal.
    pub fn with_default<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.optional = true;
        self.default = Some(Arc::new(value));
        self
    }

    /// Marks the parameter as the service-key slot: on a keyed registration
    /// it binds to the registration name instead of a graph lookup.
    pub fn service_key(mut self) -> Self {
        self.service_key = true;
        self
    }

    /// Requests the registration with this name instead of the default.
    pub fn named(mut self, name: &'static str) -> Self {
        self.named = Some(name);
        self
    }
}

/// Describes a parameter of type `T` called `name`.
pub fn param<T: Send + Sync + 'static>(name: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        ty: ServiceTy::of::<T>(),
        optional: false,
        default: None,
        service_key: false,
        simple: is_simple(TypeId::of::<T>()),
        named: None,
    }
}

fn is_simple(id: TypeId) -> bool {
    id == TypeId::of::<bool>()
        || id == TypeId::of::<char>()
        || id == TypeId::of::<String>()
        || id == TypeId::of::<&'static str>()
        || id == TypeId::of::<i8>()
        || id == TypeId::of::<i16>()
        || id == TypeId::of::<i32>()
        || id == TypeId::of::<i64>()
        || id == TypeId::of::<i128>()
        || id == TypeId::of::<isize>()
        || id == TypeId::of::<u8>()
        || id == TypeId::of::<u16>()
        || id == TypeId::of::<u32>()
        || id == TypeId::of::<u64>()
        || id == TypeId::of::<u128>()
        || id == TypeId::of::<usize>()
        || id == TypeId::of::<f32>()
        || id == TypeId::of::<f64>()
}

pub(crate) type InvokeFn = Arc<dyn Fn(&Args) -> Box<dyn Any + Send + Sync> + Send + Sync>;

/// One candidate constructor: parameters plus the invoke closure.
pub struct CtorCandidate {
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) public: bool,
    pub(crate) invoke: InvokeFn,
}

impl CtorCandidate {
    /// Marks the candidate non-public. Non-public candidates are only
    /// eligible when the implementation type itself is non-public.
    pub fn non_public(mut self) -> Self {
        self.public = false;
        self
    }
}

/// Describes a constructor with the given parameters and invoke closure.
pub fn ctor<R, F>(params: Vec<ParamSpec>, invoke: F) -> CtorCandidate
where
    R: Send + Sync + 'static,
    F: Fn(&Args) -> R + Send + Sync + 'static,
{
    CtorCandidate {
        params,
        public: true,
        invoke: Arc::new(move |args| Box::new(invoke(args))),
    }
}

pub(crate) type ApplyFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), AnyArc) + Send + Sync>;

/// A settable property: injected after construction when a value can be
/// found inline or, policy permitting, in the graph.
pub struct SetterSpec {
    pub(crate) name: &'static str,
    pub(crate) ty: ServiceTy,
    pub(crate) apply: ApplyFn,
}

/// Describes a setter on implementation type `S` accepting a `T`.
pub fn setter<S, T, F>(name: &'static str, apply: F) -> SetterSpec
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
    F: Fn(&mut S, Arc<T>) + Send + Sync + 'static,
{
    SetterSpec {
        name,
        ty: ServiceTy::of::<T>(),
        apply: Arc::new(move |target, value| {
            if let (Some(target), Ok(value)) = (target.downcast_mut::<S>(), value.downcast::<T>())
            {
                apply(target, value);
            }
        }),
    }
}

pub(crate) type DisposerFn =
    Arc<dyn Fn(&AnyArc) -> Option<Box<dyn FnOnce() + Send>> + Send + Sync>;

/// A constructed value plus its release hook, if any. The hook is handed to
/// whichever bag ends up owning the value.
pub(crate) struct Produced {
    pub(crate) value: AnyArc,
    pub(crate) dispose: Option<Box<dyn FnOnce() + Send>>,
}

impl Produced {
    pub(crate) fn bare(value: AnyArc) -> Self {
        Produced { value, dispose: None }
    }
}

/// All constructor-related metadata of a constructed registration.
pub(crate) struct ConstructorSpec {
    pub(crate) impl_name: &'static str,
    pub(crate) type_public: bool,
    pub(crate) candidates: Vec<CtorCandidate>,
    /// Explicit selection short-circuits discovery.
    pub(crate) selected: Option<usize>,
    pub(crate) inline: Vec<Arc<Instance>>,
    pub(crate) setters: Vec<SetterSpec>,
    pub(crate) disposer: Option<DisposerFn>,
}

impl ConstructorSpec {
    /// Picks the constructor to plan against, or explains why none fits.
    pub(crate) fn determine_constructor(
        &self,
        inst: &Instance,
        graph: &ServiceGraph,
    ) -> (Option<usize>, Option<String>) {
        if let Some(index) = self.selected {
            return (Some(index), None);
        }

        let mut eligible: Vec<usize> = (0..self.candidates.len())
            .filter(|&i| self.candidates[i].public)
            .collect();
        if eligible.is_empty() && !self.type_public {
            eligible = (0..self.candidates.len()).collect();
        }
        if eligible.is_empty() {
            return (None, Some(NO_PUBLIC_CONSTRUCTORS.to_string()));
        }

        eligible.sort_by(|&a, &b| {
            self.candidates[b]
                .params
                .len()
                .cmp(&self.candidates[a].params.len())
        });

        for &index in &eligible {
            if self.could_build(&self.candidates[index], inst, graph) {
                return (Some(index), None);
            }
        }

        let mut message = String::from(CANNOT_FILL_CONSTRUCTORS);
        message.push_str("\navailable constructors:");
        for &index in &eligible {
            message.push('\n');
            message.push_str(&self.explain_candidate(&self.candidates[index], inst, graph));
        }
        (None, Some(message))
    }

    fn could_build(&self, candidate: &CtorCandidate, inst: &Instance, graph: &ServiceGraph) -> bool {
        let key_params = candidate.params.iter().filter(|p| p.service_key).count();
        if key_params > 1 {
            return false;
        }
        candidate.params.iter().all(|p| {
            (inst.keyed && p.service_key)
                || self.inline.iter().any(|i| i.service == p.ty)
                || graph.find_default(p.ty).is_some()
                || p.optional
        })
    }

    fn explain_candidate(
        &self,
        candidate: &CtorCandidate,
        inst: &Instance,
        graph: &ServiceGraph,
    ) -> String {
        let signature: Vec<String> = candidate
            .params
            .iter()
            .map(|p| format!("{} {}", p.ty.name, p.name))
            .collect();
        let mut out = format!("new {}({})", self.impl_name, signature.join(", "));

        if candidate.params.iter().filter(|p| p.service_key).count() > 1 {
            out.push_str("\n* more than one parameter carries the service-key marker");
        }
        for p in &candidate.params {
            if p.service_key {
                if !inst.keyed {
                    out.push_str(&format!(
                        "\n* parameter '{}' carries the service-key marker, which is only valid on a keyed registration",
                        p.name
                    ));
                }
                continue;
            }
            let satisfied = self.inline.iter().any(|i| i.service == p.ty)
                || graph.find_default(p.ty).is_some()
                || p.optional;
            if satisfied {
                continue;
            }
            if p.simple {
                out.push_str(&format!(
                    "\n* parameter '{}' is a simple type that cannot be auto-filled",
                    p.name
                ));
            } else {
                out.push_str(&format!(
                    "\n* {} is not registered in this graph",
                    p.ty.name
                ));
            }
        }
        out
    }

    /// Finds an inline dependency for a parameter or setter: exact
    /// name-and-type match first, then type alone unless the inline
    /// dependency insists on an exact name.
    pub(crate) fn find_inline(&self, name: &str, ty: ServiceTy) -> Option<Arc<Instance>> {
        if let Some(exact) = self
            .inline
            .iter()
            .find(|i| i.service == ty && &*i.name == name)
        {
            return Some(exact.clone());
        }
        let by_type = self.inline.iter().find(|i| i.service == ty)?;
        if by_type.exact_name_only {
            None
        } else {
            Some(by_type.clone())
        }
    }

    /// Invokes the chosen candidate, applies setters and attaches the
    /// release hook.
    pub(crate) fn construct(
        &self,
        ctor_index: usize,
        args: Vec<AnyArc>,
        setters: &[(usize, AnyArc)],
    ) -> Produced {
        let candidate = &self.candidates[ctor_index];
        let mut value = (candidate.invoke)(&Args::new(args));
        for (setter_index, setter_value) in setters {
            (self.setters[*setter_index].apply)(&mut *value, setter_value.clone());
        }
        let value: AnyArc = Arc::from(value);
        let dispose = self.disposer.as_ref().and_then(|d| d(&value));
        Produced { value, dispose }
    }
}
