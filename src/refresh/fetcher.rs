// Fetcher handle used by refresh tasks.
// Wraps a zero-argument async closure that produces one source's fresh data as JSON.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::task::AbortHandle;

use crate::error::{HubError, Result};

/// Boxed future returned by a [`Fetcher`].
pub type FetchFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Cloneable, repeatedly callable data source.
///
/// Each call produces an independent future. Dropping that future abandons the
/// fetch, which is how timeouts and cancellation stop a slow source.
#[derive(Clone)]
pub struct Fetcher {
    inner: Arc<dyn Fn() -> FetchFuture + Send + Sync>,
}

impl Fetcher {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move || Box::pin(f())),
        }
    }

    /// Build a fetcher from a closure returning any serializable type.
    pub fn json<F, Fut, T>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Serialize,
    {
        Self::new(move || {
            let fut = f();
            async move { Ok(serde_json::to_value(fut.await?)?) }
        })
    }

    /// Start one fetch.
    pub fn fetch(&self) -> FetchFuture {
        (self.inner)()
    }

    /// Run one fetch as its own tokio task, failing with [`HubError::Timeout`]
    /// once `timeout` elapses.
    ///
    /// A panicking fetcher is reported as an error instead of unwinding into the
    /// caller, and dropping the returned future aborts the spawned fetch.
    pub async fn fetch_isolated(&self, timeout: Duration) -> Result<Value> {
        let fetch = self.fetch();
        let handle = tokio::spawn(async move {
            tokio::time::timeout(timeout, fetch)
                .await
                .unwrap_or(Err(HubError::Timeout))
        });
        let _guard = AbortOnDrop(handle.abort_handle());

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => Err(HubError::Other("fetcher panicked".to_string())),
            Err(e) => Err(HubError::Other(e.to_string())),
        }
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher").finish_non_exhaustive()
    }
}
