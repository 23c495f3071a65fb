//! The service graph: every registered instance grouped by capability,
//! plus open-generic templates and their closed-instance cache.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::instances::constructor::{ParamSpec, SetterSpec};
use crate::instances::Instance;
use crate::key::ServiceTy;
use crate::lifetime::Lifetime;
use crate::plan::ensure_planned;
use crate::registration::ConstructedBuilder;

/// Global policy for auto-discovered setter injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetterPolicy {
    /// Setters are only filled by explicit inline dependencies.
    #[default]
    Never,
    /// Setters whose capability has a default registration are filled.
    RegisteredTypes,
}

/// An inline dependency of an open-generic template.
pub(crate) enum TemplateDep {
    /// Used as-is by every closing.
    Concrete(Arc<Instance>),
    /// Itself open; closed with the same arguments as the outer template.
    Open(&'static str),
}

type CloseFn = dyn Fn(&[ServiceTy]) -> Option<ConstructedBuilder> + Send + Sync;

/// A registered open-generic family. Closing substitutes concrete type
/// arguments into the blueprint; the template itself is never mutated.
pub struct OpenGenericTemplate {
    pub(crate) family: &'static str,
    pub(crate) lifetime: Lifetime,
    pub(crate) close_fn: Box<CloseFn>,
    pub(crate) inline: Vec<TemplateDep>,
}

impl OpenGenericTemplate {
    /// Registers a family whose closings are produced by `close`. Returning
    /// `None` from `close` means the family has no closing for those
    /// arguments; that is a miss, never an error.
    pub fn new<F>(family: &'static str, lifetime: Lifetime, close: F) -> Self
    where
        F: Fn(&[ServiceTy]) -> Option<ConstructedBuilder> + Send + Sync + 'static,
    {
        OpenGenericTemplate {
            family,
            lifetime,
            close_fn: Box::new(close),
            inline: Vec::new(),
        }
    }

    /// Adds an inline dependency that is itself an open family, closed with
    /// the same arguments as this template.
    pub fn inline_open(mut self, family: &'static str) -> Self {
        self.inline.push(TemplateDep::Open(family));
        self
    }

    /// Adds a concrete inline literal shared by every closing.
    pub fn inline_value<T: Send + Sync + 'static>(mut self, name: &'static str, value: T) -> Self {
        self.inline.push(TemplateDep::Concrete(Arc::new(Instance::object(
            ServiceTy::of::<T>(),
            Arc::from(name),
            false,
            Arc::new(value),
        ))));
        self
    }
}

struct ServiceFamily {
    default: Option<usize>,
    instances: Vec<Arc<Instance>>,
}

type ClosedKey = (&'static str, Vec<TypeId>);

/// Immutable after build, except for the closed-generic cache which fills
/// in lazily as families are closed.
pub struct ServiceGraph {
    families: HashMap<TypeId, ServiceFamily>,
    templates: HashMap<&'static str, OpenGenericTemplate>,
    closed: Mutex<HashMap<ClosedKey, Arc<Instance>>>,
    setter_policy: SetterPolicy,
}

impl ServiceGraph {
    pub(crate) fn new(setter_policy: SetterPolicy) -> Self {
        ServiceGraph {
            families: HashMap::new(),
            templates: HashMap::new(),
            closed: Mutex::new(HashMap::new()),
            setter_policy,
        }
    }

    /// Adds an instance to its family. A same-named registration replaces
    /// the earlier one; the first instance of a family becomes its default
    /// unless a later one claims it explicitly.
    pub(crate) fn add_instance(&mut self, inst: Arc<Instance>, make_default: bool) {
        let family = self
            .families
            .entry(inst.service.id)
            .or_insert_with(|| ServiceFamily {
                default: None,
                instances: Vec::new(),
            });
        let position = family.instances.iter().position(|i| i.name == inst.name);
        let index = match position {
            Some(p) => {
                family.instances[p] = inst;
                p
            }
            None => {
                family.instances.push(inst);
                family.instances.len() - 1
            }
        };
        if make_default || family.default.is_none() {
            family.default = Some(index);
        }
    }

    pub(crate) fn add_template(&mut self, template: OpenGenericTemplate) {
        self.templates.insert(template.family, template);
    }

    /// The default instance for a capability, if one is registered.
    pub(crate) fn find_default(&self, ty: ServiceTy) -> Option<Arc<Instance>> {
        let family = self.families.get(&ty.id)?;
        family.default.map(|i| family.instances[i].clone())
    }

    pub(crate) fn find_named(&self, ty: ServiceTy, name: &str) -> Option<Arc<Instance>> {
        self.families
            .get(&ty.id)?
            .instances
            .iter()
            .find(|i| &*i.name == name)
            .cloned()
    }

    /// Lookup for a constructor parameter: honors a named request on the
    /// parameter, else the family default.
    pub(crate) fn find_instance(&self, param: &ParamSpec) -> Option<Arc<Instance>> {
        match param.named {
            Some(name) => self.find_named(param.ty, name),
            None => self.find_default(param.ty),
        }
    }

    /// Whether an unmatched setter may be filled from the graph.
    pub(crate) fn should_be_set(&self, _setter: &SetterSpec) -> bool {
        self.setter_policy == SetterPolicy::RegisteredTypes
    }

    /// Closes `family` over `args`. Returns the cached closing when the
    /// same argument signature was closed before; `None` when the family is
    /// unknown or declines the arguments.
    pub(crate) fn close(
        &self,
        family: &'static str,
        args: &[ServiceTy],
    ) -> Option<Arc<Instance>> {
        let signature: Vec<TypeId> = args.iter().map(|a| a.id).collect();
        if let Some(existing) = self.closed.lock().get(&(family, signature.clone())) {
            return Some(existing.clone());
        }

        let template = self.templates.get(family)?;
        let mut builder = (template.close_fn)(args)?;
        for dep in &template.inline {
            match dep {
                TemplateDep::Concrete(inst) => builder.push_inline(inst.clone()),
                TemplateDep::Open(inner_family) => {
                    builder.push_inline(self.close(inner_family, args)?)
                }
            }
        }

        let arg_names: Vec<&str> = args.iter().map(|a| a.name).collect();
        let name = format!("{}<{}>", family, arg_names.join(", "));
        let inst = Arc::new(builder.into_closed_instance(template.lifetime, name));
        ensure_planned(&inst, self);

        let mut closed = self.closed.lock();
        // Another closer may have raced us; keep the first one so every
        // caller observes the same Instance.
        Some(
            closed
                .entry((family, signature))
                .or_insert(inst)
                .clone(),
        )
    }

    /// Every registered instance plus every closing produced so far.
    pub(crate) fn all_instances(&self) -> Vec<Arc<Instance>> {
        let mut all: Vec<Arc<Instance>> = self
            .families
            .values()
            .flat_map(|f| f.instances.iter().cloned())
            .collect();
        all.extend(self.closed.lock().values().cloned());
        all
    }
}
