// Background refresh task for a single source.
// Fetches on a fixed interval, records every outcome in the cache, and stops only when cancelled.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::CacheStore;

use super::fetcher::Fetcher;

/// Default deadline for a single fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle phase of a refresh task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPhase {
    /// Waiting out the initial stagger delay.
    #[default]
    Pending,
    Fetching,
    /// Waiting for the next interval.
    Sleeping,
    /// Terminal: the task has exited.
    Cancelled,
}

impl RefreshPhase {
    pub fn display(&self) -> &'static str {
        match self {
            RefreshPhase::Pending => "pending",
            RefreshPhase::Fetching => "fetching",
            RefreshPhase::Sleeping => "sleeping",
            RefreshPhase::Cancelled => "cancelled",
        }
    }

    #[cfg(test)]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RefreshPhase::Cancelled)
    }
}

/// Scheduling parameters for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Cache key the results are stored under.
    pub key: String,
    /// Pause between the end of one fetch and the start of the next.
    pub interval: Duration,
    /// Deadline for a single fetch.
    pub timeout: Duration,
    /// One-time wait before the first fetch.
    pub initial_delay: Duration,
}

impl SourceConfig {
    /// Create a config polling every `interval_secs` seconds (at least one).
    pub fn new(key: impl Into<String>, interval_secs: u64) -> Self {
        Self {
            key: key.into(),
            interval: Duration::from_secs(interval_secs.max(1)),
            timeout: DEFAULT_TIMEOUT,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// One polling loop: a source config, its fetcher, and a phase channel.
#[derive(Debug)]
pub struct RefreshTask {
    config: SourceConfig,
    fetcher: Fetcher,
    phase: watch::Sender<RefreshPhase>,
}

impl RefreshTask {
    pub fn new(config: SourceConfig, fetcher: Fetcher) -> Self {
        let (phase, _) = watch::channel(RefreshPhase::Pending);
        Self {
            config,
            fetcher,
            phase,
        }
    }

    pub fn key(&self) -> &str {
        &self.config.key
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Watch the task's phase transitions.
    pub fn subscribe(&self) -> watch::Receiver<RefreshPhase> {
        self.phase.subscribe()
    }

    /// Run until `cancel` fires.
    ///
    /// Fetch failures, timeouts and fetcher panics are written to the cache as
    /// errors and the loop carries on. Cancellation is honoured while waiting
    /// and while a fetch is in flight; a cancelled fetch writes nothing.
    pub async fn run(self, store: CacheStore, cancel: CancellationToken) {
        let key = self.config.key.as_str();

        if !self.config.initial_delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return self.finish(),
                _ = tokio::time::sleep(self.config.initial_delay) => {}
            }
        }

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.phase.send_replace(RefreshPhase::Fetching);
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.fetcher.fetch_isolated(self.config.timeout) => outcome,
            };

            match outcome {
                Ok(data) => {
                    debug!(key, "refreshed");
                    store.set(key, data);
                }
                Err(e) => {
                    warn!(key, error = %e, "refresh failed");
                    store.set_error(key, e.to_string());
                }
            }

            self.phase.send_replace(RefreshPhase::Sleeping);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        self.finish();
    }

    fn finish(&self) {
        self.phase.send_replace(RefreshPhase::Cancelled);
        debug!(key = %self.config.key, "refresh task stopped");
    }
}
