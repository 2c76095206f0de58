// Health report.
// Uptime plus per-source freshness, last error and refresh phase, straight from the cache and supervisor.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceHealth {
    pub updated_at: Option<DateTime<Utc>>,
    /// Whole seconds since `updated_at`.
    pub age_seconds: Option<i64>,
    /// Refresh phase, absent for keys without a background task.
    pub phase: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub uptime_seconds: u64,
    pub cache_keys: Vec<String>,
    pub sources: BTreeMap<String, SourceHealth>,
}

impl HealthReport {
    pub fn collect(state: &AppState, now: DateTime<Utc>) -> Self {
        let mut errors = state.store.errors();
        let phases = state.phases.current();

        let sources = state
            .store
            .timestamps()
            .into_iter()
            .map(|(key, updated_at)| {
                let health = SourceHealth {
                    updated_at,
                    age_seconds: updated_at.map(|at| (now - at).num_seconds().max(0)),
                    phase: phases.get(&key).map(|phase| phase.display().to_string()),
                    error: errors.remove(&key).flatten(),
                };
                (key, health)
            })
            .collect();

        Self {
            status: "ok".to_string(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
            cache_keys: state.store.keys(),
            sources,
        }
    }
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport::collect(&state, Utc::now()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::api::testing::start_hub;
    use crate::test_support::fake_homebridge;

    #[tokio::test]
    async fn test_health_reports_sources() {
        let (homebridge_url, _fake) = fake_homebridge().await;
        let hub = start_hub(&homebridge_url, "").await;
        hub.store.set("fitness", json!({"placeholder": true}));
        hub.store.set_error("pihole", "timed out");

        let mut report: Option<HealthReport> = None;
        for _ in 0..100 {
            let fetched: HealthReport = reqwest::get(format!("{}/healthz", hub.url))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            let polled = fetched.sources.contains_key("lights");
            report = Some(fetched);
            if polled {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let report = report.unwrap();

        assert_eq!(hub.supervisor.len(), 1);
        assert_eq!(report.status, "ok");
        assert_eq!(report.cache_keys, vec!["fitness", "lights", "pihole"]);

        let lights = &report.sources["lights"];
        assert!(lights.updated_at.is_some());
        assert_eq!(lights.age_seconds, Some(0));
        assert!(lights.error.is_none());
        assert!(lights.phase.is_some());

        let fitness = &report.sources["fitness"];
        assert!(fitness.phase.is_none());

        let pihole = &report.sources["pihole"];
        assert!(pihole.updated_at.is_none());
        assert!(pihole.age_seconds.is_none());
        assert_eq!(pihole.error.as_deref(), Some("timed out"));
    }
}
