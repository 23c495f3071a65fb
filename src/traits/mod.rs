//! Public traits: disposal contracts and the resolver surface.

mod dispose;
mod resolver;

pub use dispose::{AsyncDispose, AsyncDisposeAdapter, Dispose};
pub use resolver::{Resolver, ResolverCore};
