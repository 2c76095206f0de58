// Supervisor for the background refresh tasks.
// Starts one task per source, tracks their handles, and cancels and joins them on shutdown.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::cache::CacheStore;

use super::fetcher::Fetcher;
use super::resync::Resync;
use super::task::{RefreshPhase, RefreshTask};

/// Fetcher and deadline registered for a key, reused by one-shot refreshes.
#[derive(Debug, Clone)]
pub(crate) struct RegisteredSource {
    pub fetcher: Fetcher,
    pub timeout: Duration,
}

#[derive(Debug)]
struct SupervisedTask {
    key: String,
    handle: JoinHandle<()>,
}

/// Read-only view of every task's phase; outlives the supervisor's handles.
#[derive(Debug, Clone, Default)]
pub struct PhaseWatch {
    phases: Arc<Vec<(String, watch::Receiver<RefreshPhase>)>>,
}

impl PhaseWatch {
    /// Current phase per task key.
    pub fn current(&self) -> BTreeMap<String, RefreshPhase> {
        self.phases
            .iter()
            .map(|(key, phase)| (key.clone(), *phase.borrow()))
            .collect()
    }
}

/// Owns every running refresh task for the lifetime of the process.
#[derive(Debug)]
pub struct TaskSupervisor {
    store: CacheStore,
    cancel: CancellationToken,
    sources: Arc<HashMap<String, RegisteredSource>>,
    tasks: Vec<SupervisedTask>,
    phases: PhaseWatch,
    resyncs: TaskTracker,
}

impl TaskSupervisor {
    /// Spawn every task onto the current tokio runtime.
    pub fn start(store: CacheStore, tasks: Vec<RefreshTask>) -> Self {
        let cancel = CancellationToken::new();
        let mut sources = HashMap::with_capacity(tasks.len());
        let mut supervised = Vec::with_capacity(tasks.len());
        let mut phases = Vec::with_capacity(tasks.len());

        for task in tasks {
            let key = task.key().to_string();
            let registered = RegisteredSource {
                fetcher: task.fetcher().clone(),
                timeout: task.config().timeout,
            };
            if sources.insert(key.clone(), registered).is_some() {
                warn!(key = %key, "duplicate refresh source registered");
            }

            phases.push((key.clone(), task.subscribe()));
            let handle = tokio::spawn(task.run(store.clone(), cancel.child_token()));
            supervised.push(SupervisedTask { key, handle });
        }

        info!(tasks = supervised.len(), "refresh tasks started");

        Self {
            store,
            cancel,
            sources: Arc::new(sources),
            tasks: supervised,
            phases: PhaseWatch {
                phases: Arc::new(phases),
            },
            resyncs: TaskTracker::new(),
        }
    }

    /// Number of tasks still owned by the supervisor.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Phase view of every task started by this supervisor.
    pub fn phases(&self) -> PhaseWatch {
        self.phases.clone()
    }

    /// Handle for scheduling delayed one-shot refreshes of registered keys.
    ///
    /// Refreshes scheduled through it are cancelled by [`TaskSupervisor::shutdown`].
    pub fn resync(&self, delay: Duration) -> Resync {
        Resync::new(
            self.store.clone(),
            self.sources.clone(),
            delay,
            self.cancel.child_token(),
            self.resyncs.clone(),
        )
    }

    /// Cancel every task, including scheduled resyncs, and wait for all of them to exit.
    ///
    /// Safe to call more than once; later calls find nothing left to join.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        self.resyncs.close();

        for task in self.tasks.drain(..) {
            match task.handle.await {
                Err(e) if e.is_panic() => error!(key = %task.key, "refresh task panicked"),
                _ => {}
            }
        }
        self.resyncs.wait().await;

        info!("refresh tasks stopped");
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
