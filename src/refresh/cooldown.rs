// Cooldown gate for write actions.
// Rejects repeated invocations of the same action inside a fixed window so the upstream controller is not flooded.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{HubError, Result};

/// Default minimum spacing between two accepted invocations of one action.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);

/// Per-action rate limiter keyed by action name.
#[derive(Debug)]
pub struct CooldownGate {
    window: Duration,
    last_accepted: Mutex<HashMap<String, Instant>>,
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Accept `action` at `now` unless it was accepted less than one window ago.
    ///
    /// A rejected call leaves the recorded time alone, so rejections never push
    /// the next allowed invocation further out.
    pub fn check_and_record(&self, action: &str, now: Instant) -> bool {
        let mut last_accepted = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let cooling = last_accepted
            .get(action)
            .is_some_and(|last| now.saturating_duration_since(*last) < self.window);
        if cooling {
            return false;
        }

        last_accepted.insert(action.to_string(), now);
        true
    }

    /// [`CooldownGate::check_and_record`] at the current instant, as a `Result`.
    pub fn acquire(&self, action: &str) -> Result<()> {
        if self.check_and_record(action, Instant::now()) {
            Ok(())
        } else {
            Err(HubError::CooldownActive(action.to_string()))
        }
    }
}
