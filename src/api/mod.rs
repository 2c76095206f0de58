// HTTP API for the smartpanel hub.
// Serves cached snapshots, a health report, and light write actions behind an API key.

pub mod auth;
pub mod health;
pub mod lights;
pub mod sources;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::cache::CacheStore;
use crate::config::Settings;
use crate::refresh::{CooldownGate, PhaseWatch, Resync};
use crate::services::HomebridgeClient;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: CacheStore,
    pub homebridge: Arc<HomebridgeClient>,
    pub cooldown: Arc<CooldownGate>,
    pub resync: Resync,
    pub phases: PhaseWatch,
    pub settings: Arc<Settings>,
    pub started_at: Instant,
}

/// Build the full router with API-key middleware applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/lights", get(sources::lights))
        .route("/api/lights/{unique_id}/toggle", post(lights::toggle_light))
        .route("/api/scenes/all_on", post(lights::scene_all_on))
        .route("/api/scenes/movie", post(lights::scene_movie))
        .route("/api/pihole", get(sources::pihole))
        .route("/api/network", get(sources::network))
        .route("/api/weather/today", get(sources::weather))
        .route("/api/todos", get(sources::todos))
        .route("/api/fitness", get(sources::fitness))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use reqwest::Client;

    use super::*;
    use crate::config::{KEY_LIGHTS, Settings};
    use crate::refresh::{RefreshTask, SourceConfig, TaskSupervisor};
    use crate::services::fetcher_for;
    use crate::test_support::{FAKE_PASSWORD, serve};

    pub const API_KEY: &str = "panel-key";

    /// A running hub wired to `homebridge_url`. Only `lights` is polled, hourly.
    pub struct Hub {
        pub url: String,
        pub store: CacheStore,
        pub supervisor: TaskSupervisor,
    }

    pub async fn start_hub(homebridge_url: &str, scene_ids: &str) -> Hub {
        start_hub_with_key(homebridge_url, scene_ids, API_KEY).await
    }

    /// Like [`start_hub`], with `api_key` as `SMARTPANEL_API_KEY`; empty disables auth.
    pub async fn start_hub_with_key(homebridge_url: &str, scene_ids: &str, api_key: &str) -> Hub {
        let homebridge_url = homebridge_url.to_string();
        let scene_ids = scene_ids.to_string();
        let api_key = api_key.to_string();
        let settings = Settings::from_lookup(|key| match key {
            "SMARTPANEL_API_KEY" => Some(api_key.clone()),
            "HOMEBRIDGE_URL" => Some(homebridge_url.clone()),
            "HOMEBRIDGE_PASSWORD" => Some(FAKE_PASSWORD.to_string()),
            "SCENE_ALL_ON_IDS" => Some(scene_ids.clone()),
            _ => None,
        })
        .unwrap();

        let http = Client::new();
        let store = CacheStore::new();
        let homebridge = Arc::new(HomebridgeClient::from_settings(http.clone(), &settings));
        let lights = fetcher_for(KEY_LIGHTS, &settings, &http, &homebridge).unwrap();
        let supervisor = TaskSupervisor::start(
            store.clone(),
            vec![RefreshTask::new(SourceConfig::new(KEY_LIGHTS, 3600), lights)],
        );

        let state = AppState {
            store: store.clone(),
            homebridge,
            cooldown: Arc::new(CooldownGate::new(settings.action_cooldown)),
            resync: supervisor.resync(Duration::from_millis(10)),
            phases: supervisor.phases(),
            settings: Arc::new(settings),
            started_at: Instant::now(),
        };

        Hub {
            url: serve(router(state)).await,
            store,
            supervisor,
        }
    }
}
