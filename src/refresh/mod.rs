// Background refresh engine.
// Polls every source on its own task, records outcomes in the cache, and gates write-triggered re-syncs.

pub mod cooldown;
pub mod fetcher;
pub mod resync;
pub mod supervisor;
pub mod task;

pub use cooldown::{CooldownGate, DEFAULT_COOLDOWN};
pub use fetcher::Fetcher;
pub use resync::{DEFAULT_RESYNC_DELAY, Resync};
pub use supervisor::{PhaseWatch, TaskSupervisor};
pub use task::{RefreshTask, SourceConfig};
