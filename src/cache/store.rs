// In-memory cache store for polled source data.
// Keeps the latest value per key together with freshness and last-error metadata.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error reported for keys that no refresh has touched yet.
pub const NOT_YET_FETCHED: &str = "not yet fetched";

/// Snapshot of one cached source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Result of the last successful fetch, or null.
    pub data: Value,
    /// When the last successful fetch completed.
    pub updated_at: Option<DateTime<Utc>>,
    /// Message from the most recent failed fetch, cleared by the next success.
    pub error: Option<String>,
}

impl CacheEntry {
    /// Entry returned for keys without any recorded fetch.
    pub fn not_yet_fetched() -> Self {
        Self {
            data: Value::Null,
            updated_at: None,
            error: Some(NOT_YET_FETCHED.to_string()),
        }
    }

    fn fresh(data: Value, updated_at: DateTime<Utc>) -> Self {
        Self {
            data,
            updated_at: Some(updated_at),
            error: None,
        }
    }
}

/// Shared key → entry map. Cloning yields another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned copy of the entry for `key`, or the "not yet fetched" placeholder.
    pub fn get(&self, key: &str) -> CacheEntry {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .cloned()
            .unwrap_or_else(CacheEntry::not_yet_fetched)
    }

    /// Replace the entry for `key` with fresh data and clear its error.
    ///
    /// `updated_at` never goes backwards for a key, even if the wall clock does.
    pub fn set(&self, key: &str, data: Value) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut now = Utc::now();
        if let Some(prev) = entries
            .get(key)
            .and_then(|entry| entry.updated_at)
            .filter(|prev| now <= *prev)
        {
            now = prev + chrono::Duration::microseconds(1);
        }
        entries.insert(key.to_string(), CacheEntry::fresh(data, now));
    }

    /// Record a failed fetch. Existing data and timestamp are left untouched.
    pub fn set_error(&self, key: &str, message: impl Into<String>) {
        let message = message.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(key) {
            Some(entry) => entry.error = Some(message),
            None => {
                entries.insert(
                    key.to_string(),
                    CacheEntry {
                        data: Value::Null,
                        updated_at: None,
                        error: Some(message),
                    },
                );
            }
        }
    }

    /// All keys that have been written, sorted.
    pub fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Last successful update per key.
    pub fn timestamps(&self) -> BTreeMap<String, Option<DateTime<Utc>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.updated_at))
            .collect()
    }

    /// Current error per key.
    pub fn errors(&self) -> BTreeMap<String, Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.error.clone()))
            .collect()
    }
}
