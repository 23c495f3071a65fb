//! Whole-container configuration validation.

use std::collections::HashSet;

use crate::error::{DiError, DiResult};
use crate::provider::{Container, ResolutionSite};

/// How thorough [`Container::assert_configuration_is_valid`] should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertMode {
    /// Verify wiring only: every plan must be free of recorded errors.
    BuildOnly,
    /// Verify wiring, then instantiate every instance in a throwaway scope
    /// and aggregate resolution failures too.
    Full,
}

impl Container {
    /// Walks every registered instance, including closings produced so
    /// far, and aggregates every recorded plan error into one
    /// [`DiError::InvalidConfiguration`]. Nothing is constructed in
    /// [`AssertMode::BuildOnly`].
    pub fn assert_configuration_is_valid(&self, mode: AssertMode) -> DiResult<()> {
        let graph = &self.inner().graph;
        let mut failures = Vec::new();
        let mut seen = HashSet::new();
        let mut broken = HashSet::new();
        let mut queue = graph.all_instances();

        while let Some(inst) = queue.pop() {
            if !seen.insert(inst.id) {
                continue;
            }
            if let Some(plan) = inst.plan.get() {
                for error in &plan.errors {
                    broken.insert(inst.id);
                    failures.push(format!("{}: {}", inst.label(), error));
                }
                queue.extend(plan.dependencies().cloned());
            }
        }

        if mode == AssertMode::Full {
            let scope = self.create_scope();
            let site = ResolutionSite::for_scope(&scope);
            for inst in graph.all_instances() {
                if broken.contains(&inst.id) {
                    continue;
                }
                if let Err(e) = site.resolve(&inst) {
                    failures.push(format!("{}: {}", inst.label(), e));
                }
            }
            let _ = scope.dispose();
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DiError::InvalidConfiguration(failures))
        }
    }
}
