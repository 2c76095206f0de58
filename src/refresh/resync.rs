// Delayed one-shot refreshes after write actions.
// Pulls post-write state into the cache sooner than the next regular cycle would.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

use crate::cache::CacheStore;

use super::supervisor::RegisteredSource;

/// Default wait between a successful write and the follow-up refresh.
pub const DEFAULT_RESYNC_DELAY: Duration = Duration::from_secs(2);

/// Schedules detached refreshes of keys registered with the supervisor.
#[derive(Debug, Clone)]
pub struct Resync {
    store: CacheStore,
    sources: Arc<HashMap<String, RegisteredSource>>,
    delay: Duration,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

/// A scheduled one-shot refresh running on its own task.
///
/// Errors are dropped: a failed or timed-out refresh leaves the cache as it
/// was (no error is recorded) and the next regular cycle corrects it. The
/// refresh is owned by the supervisor, which cancels and awaits it on shutdown.
#[derive(Debug)]
pub struct DetachedRefresh {
    key: String,
}

impl DetachedRefresh {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Resync {
    pub(crate) fn new(
        store: CacheStore,
        sources: Arc<HashMap<String, RegisteredSource>>,
        delay: Duration,
        cancel: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            store,
            sources,
            delay,
            cancel,
            tracker,
        }
    }

    /// Refresh `key` once after the configured delay, detached from the caller.
    ///
    /// Returns `None` when no source is registered under `key`.
    pub fn schedule(&self, key: &str) -> Option<DetachedRefresh> {
        let source = self.sources.get(key)?.clone();
        let store = self.store.clone();
        let cancel = self.cancel.clone();
        let delay = self.delay;
        let task_key = key.to_string();

        self.tracker.spawn(async move {
            let refresh = async {
                tokio::time::sleep(delay).await;
                source.fetcher.fetch_isolated(source.timeout).await
            };
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                outcome = refresh => outcome,
            };

            match outcome {
                Ok(data) => {
                    debug!(key = %task_key, "resync refreshed");
                    store.set(&task_key, data);
                }
                Err(e) => debug!(key = %task_key, error = %e, "resync dropped"),
            }
        });

        Some(DetachedRefresh {
            key: key.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::error::HubError;
    use crate::refresh::fetcher::Fetcher;

    fn resync_with(key: &str, fetcher: Fetcher, store: CacheStore) -> (Resync, CancellationToken) {
        let mut sources = HashMap::new();
        sources.insert(
            key.to_string(),
            RegisteredSource {
                fetcher,
                timeout: Duration::from_secs(5),
            },
        );
        let cancel = CancellationToken::new();
        let resync = Resync::new(
            store,
            Arc::new(sources),
            DEFAULT_RESYNC_DELAY,
            cancel.clone(),
            TaskTracker::new(),
        );
        (resync, cancel)
    }

    async fn settle(resync: &Resync) {
        resync.tracker.close();
        resync.tracker.wait().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshes_after_delay() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = {
            let calls = calls.clone();
            Fetcher::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!([{"uniqueId": "a", "on": true}])) }
            })
        };
        let (resync, _cancel) = resync_with("lights", fetcher, store.clone());

        let scheduled = resync.schedule("lights").unwrap();
        assert_eq!(scheduled.key(), "lights");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.keys().is_empty());

        settle(&resync).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("lights").data, json!([{"uniqueId": "a", "on": true}]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resync_is_dropped() {
        let store = CacheStore::new();
        store.set("lights", json!(["before"]));
        let fetcher = Fetcher::new(|| async { Err(HubError::Other("homebridge down".into())) });
        let (resync, _cancel) = resync_with("lights", fetcher, store.clone());

        resync.schedule("lights").unwrap();
        settle(&resync).await;

        let entry = store.get("lights");
        assert_eq!(entry.data, json!(["before"]));
        assert!(entry.error.is_none());
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_scheduled() {
        let store = CacheStore::new();
        let fetcher = Fetcher::new(|| async { Ok(json!(null)) });
        let (resync, _cancel) = resync_with("lights", fetcher, store);

        assert!(resync.schedule("weather").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_resync_writes_nothing() {
        let store = CacheStore::new();
        let fetcher = Fetcher::new(|| async { Ok(json!("fresh")) });
        let (resync, cancel) = resync_with("lights", fetcher, store.clone());

        resync.schedule("lights").unwrap();
        cancel.cancel();
        settle(&resync).await;

        assert!(store.keys().is_empty());
    }
}
