//! Service lifetime management.

/// How many values an instance may produce, and who owns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// A fresh value per resolution. Never cached.
    Transient,
    /// At most one value per scope, cached in that scope.
    Scoped,
    /// At most one value per container, cached at the root.
    Singleton,
}

impl Lifetime {
    /// Lowercase name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
            Lifetime::Singleton => "singleton",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
