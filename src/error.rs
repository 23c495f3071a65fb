//! Error types for resolution, validation and disposal.
//!
//! Graph-construction problems are recorded on the broken instance while the
//! registry is being planned; they only surface here when that instance is
//! actually resolved, or all at once through
//! [`Container::assert_configuration_is_valid`](crate::Container::assert_configuration_is_valid).

use std::fmt;

/// Errors produced by the container.
#[derive(Debug, Clone, PartialEq)]
pub enum DiError {
    /// No default registration exists for the requested capability.
    NotFound(&'static str),
    /// No registration with this name exists for the requested capability.
    NotFoundNamed(&'static str, String),
    /// A resolved value could not be downcast to the requested type.
    TypeMismatch(&'static str),
    /// The instance's plan recorded errors when the registry was built.
    Configuration {
        /// "capability (name)" of the broken instance.
        instance: String,
        /// Everything the planner recorded against it.
        messages: Vec<String>,
    },
    /// Aggregate of every problem found by configuration validation.
    InvalidConfiguration(Vec<String>),
    /// One or more disposal hooks panicked while a scope was torn down.
    Disposal(Vec<String>),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(ty) => {
                write!(f, "no registration found for {}", ty)
            }
            DiError::NotFoundNamed(ty, name) => {
                write!(f, "no registration named '{}' found for {}", name, ty)
            }
            DiError::TypeMismatch(ty) => {
                write!(f, "resolved value is not a {}", ty)
            }
            DiError::Configuration { instance, messages } => {
                write!(f, "cannot build {}", instance)?;
                for m in messages {
                    write!(f, "\n  {}", m)?;
                }
                Ok(())
            }
            DiError::InvalidConfiguration(failures) => {
                write!(f, "container configuration is invalid:")?;
                for failure in failures {
                    write!(f, "\n  {}", failure)?;
                }
                Ok(())
            }
            DiError::Disposal(labels) => {
                write!(f, "disposal hooks panicked for:")?;
                for label in labels {
                    write!(f, "\n  {}", label)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for DiError {}

/// Result alias used throughout the crate.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let e = DiError::NotFound("app::Database");
        assert_eq!(e.to_string(), "no registration found for app::Database");
    }

    #[test]
    fn display_configuration_lists_messages() {
        let e = DiError::Configuration {
            instance: "app::Repo (default)".to_string(),
            messages: vec!["first".to_string(), "second".to_string()],
        };
        let rendered = e.to_string();
        assert!(rendered.contains("cannot build app::Repo (default)"));
        assert!(rendered.contains("first"));
        assert!(rendered.contains("second"));
    }
}
