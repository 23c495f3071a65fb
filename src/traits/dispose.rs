//! Disposal contracts.
//!
//! Scopes release owned resources through these traits when
//! `dispose()` is called. Asynchronous releases are adapted to a blocking
//! synchronous release so a single teardown path drains both kinds.

use std::sync::Arc;

use async_trait::async_trait;

/// Synchronous release of an owned resource.
pub trait Dispose: Send + Sync + 'static {
    /// Release the resource. Called at most once per owned value.
    fn dispose(&self);
}

/// Asynchronous release of an owned resource.
#[async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Release the resource.
    async fn dispose(&self);
}

/// Adapts an [`AsyncDispose`] resource to the synchronous [`Dispose`]
/// contract by blocking on its future.
pub struct AsyncDisposeAdapter<T: AsyncDispose> {
    inner: Arc<T>,
}

impl<T: AsyncDispose> AsyncDisposeAdapter<T> {
    pub fn new(inner: Arc<T>) -> Self {
        AsyncDisposeAdapter { inner }
    }
}

impl<T: AsyncDispose> Dispose for AsyncDisposeAdapter<T> {
    fn dispose(&self) {
        futures::executor::block_on(self.inner.dispose());
    }
}
