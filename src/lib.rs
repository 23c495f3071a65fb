//! # forge-di
//!
//! A plan-compiling dependency injection container: registrations are
//! planned once into immutable, typed resolution plans, then served by two
//! interchangeable backends with hierarchical scopes and deterministic
//! disposal.
//!
//! ## Features
//!
//! - **Constructor selection**: candidates ranked by parameter count, first
//!   satisfiable wins, with per-candidate explanations on failure
//! - **Three lifetimes**: Singleton, Scoped, and Transient
//! - **Two backends**: an interpreted quick path and precompiled build
//!   plans, guaranteed to agree
//! - **Open generics**: templates closed on demand, cached per argument
//!   signature
//! - **Deterministic disposal**: LIFO release per scope, sync and async
//!   contracts, panic-tolerant teardown
//! - **Recorded errors**: broken registrations fail when resolved or
//!   validated, never when registered
//!
//! ## Quick Start
//!
//! ```rust
//! use forge_di::{ctor, param, ConstructedBuilder, Lifetime, Resolver, ServiceRegistry};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut registry = ServiceRegistry::new();
//! registry.add_literal(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! registry.register(
//!     ConstructedBuilder::of::<UserService>(Lifetime::Transient)
//!         .ctor(ctor(vec![param::<Database>("db")], |args| UserService {
//!             db: args.get::<Database>(0),
//!         })),
//! );
//!
//! let container = registry.build();
//! let users = container.get_required::<UserService>();
//! assert_eq!(users.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Scopes
//!
//! Scoped services are cached per [`Scope`]; singletons are cached at the
//! container and constructed against the root, so everything a singleton
//! owns outlives every child scope. Dispose a scope to release what it
//! owns, in reverse creation order.

pub mod error;
pub mod graph;
pub mod instances;
pub mod key;
pub mod lifetime;
pub mod plan;
pub mod provider;
pub mod registration;
pub mod traits;
pub mod validation;

mod internal;

pub use error::{DiError, DiResult};
pub use graph::{OpenGenericTemplate, SetterPolicy};
pub use instances::constructor::{ctor, param, setter, Args, CtorCandidate, ParamSpec, SetterSpec};
pub use instances::{AnyArc, Instance};
pub use key::{service_ty, ServiceTy};
pub use lifetime::Lifetime;
pub use plan::{BuildMode, BuildPlan, BuildStep, DisposeTracking};
pub use provider::{Container, ExecutionMode, Scope, ScopeCtx};
pub use registration::{ConstructedBuilder, ServiceRegistry};
pub use traits::{AsyncDispose, AsyncDisposeAdapter, Dispose, Resolver, ResolverCore};
pub use validation::AssertMode;
