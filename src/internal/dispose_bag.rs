//! Bag of release hooks owned by a scope.
//!
//! Hooks drain in LIFO order so resources are released in reverse creation
//! order. A panicking hook never stops the drain: each hook runs under
//! `catch_unwind` and failures are collected for the caller to surface.

use std::panic::{catch_unwind, AssertUnwindSafe};

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<(String, Hook)>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, label: String, hook: Hook) {
        self.hooks.push((label, hook));
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Runs every hook, newest first. Returns the labels of hooks that
    /// panicked.
    pub(crate) fn drain_all(&mut self) -> Vec<String> {
        let mut failures = Vec::new();
        while let Some((label, hook)) = self.hooks.pop() {
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                failures.push(label);
            }
        }
        failures
    }
}
