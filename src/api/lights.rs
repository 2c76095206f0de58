// Light write actions.
// Toggles and scenes pass the cooldown gate, write to Homebridge, then schedule a delayed lights refresh.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::KEY_LIGHTS;
use crate::error::{HubError, Result};
use crate::services::homebridge::{BatchResult, ToggleResult};

use super::AppState;

/// Response body of a scene action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SceneResult {
    pub scene: String,
    #[serde(flatten)]
    pub result: BatchResult,
}

pub async fn toggle_light(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Result<Json<ToggleResult>> {
    state.cooldown.acquire(&format!("toggle:{unique_id}"))?;

    let toggled = state.homebridge.toggle_light(&unique_id).await?;
    info!(unique_id = %toggled.unique_id, on = toggled.on, "light toggled");
    schedule_resync(&state);
    Ok(Json(toggled))
}

fn schedule_resync(state: &AppState) {
    match state.resync.schedule(KEY_LIGHTS) {
        Some(refresh) => debug!(key = refresh.key(), "resync scheduled"),
        None => warn!(key = KEY_LIGHTS, "no refresh source to resync"),
    }
}

pub async fn scene_all_on(State(state): State<AppState>) -> Result<Json<SceneResult>> {
    let ids = &state.settings.scene_all_on_ids;
    run_scene(&state, "all_on", "SCENE_ALL_ON_IDS", ids, true).await
}

pub async fn scene_movie(State(state): State<AppState>) -> Result<Json<SceneResult>> {
    let ids = &state.settings.scene_movie_off_ids;
    run_scene(&state, "movie", "SCENE_MOVIE_OFF_IDS", ids, false).await
}

/// Switch every light in `ids`. Partial failure is reported in the body, not as an error status.
async fn run_scene(
    state: &AppState,
    scene: &str,
    setting: &str,
    ids: &[String],
    on: bool,
) -> Result<Json<SceneResult>> {
    if ids.is_empty() {
        return Err(HubError::NotConfigured(setting.to_string()));
    }
    state.cooldown.acquire(scene)?;

    let result = state.homebridge.set_lights(ids, on).await;
    info!(
        scene,
        affected = result.affected,
        failed = result.errors.len(),
        "scene applied"
    );
    if result.affected > 0 {
        schedule_resync(state);
    }

    Ok(Json(SceneResult {
        scene: scene.to_string(),
        result,
    }))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{Client, StatusCode};
    use serde_json::{Value, json};

    use crate::api::auth::API_KEY_HEADER;
    use crate::api::testing::{API_KEY, start_hub};
    use crate::test_support::fake_homebridge;

    async fn post(url: String) -> (StatusCode, Value) {
        let response = Client::new()
            .post(url)
            .header(API_KEY_HEADER, API_KEY)
            .send()
            .await
            .unwrap();
        (response.status(), response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_toggle_flips_light_and_resyncs() {
        let (homebridge_url, fake) = fake_homebridge().await;
        let hub = start_hub(&homebridge_url, "").await;

        let (status, body) = post(format!("{}/api/lights/lamp/toggle", hub.url)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"uniqueId": "lamp", "name": "Desk Lamp", "on": false}));
        assert_eq!(fake.is_on("lamp"), Some(false));

        let mut lamp_on = None;
        for _ in 0..100 {
            let data = hub.store.get("lights").data;
            lamp_on = data
                .as_array()
                .and_then(|lights| lights.iter().find(|light| light["uniqueId"] == "lamp"))
                .map(|lamp| lamp["on"].clone());
            if lamp_on == Some(json!(false)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(lamp_on, Some(json!(false)));
    }

    #[tokio::test]
    async fn test_toggle_unknown_light_is_404() {
        let (homebridge_url, _fake) = fake_homebridge().await;
        let hub = start_hub(&homebridge_url, "").await;

        let (status, body) = post(format!("{}/api/lights/ghost/toggle", hub.url)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"detail": "Accessory ghost not found"}));
    }

    #[tokio::test]
    async fn test_repeated_toggle_hits_cooldown() {
        let (homebridge_url, fake) = fake_homebridge().await;
        let hub = start_hub(&homebridge_url, "").await;

        let (first, _) = post(format!("{}/api/lights/strip/toggle", hub.url)).await;
        let (second, _) = post(format!("{}/api/lights/strip/toggle", hub.url)).await;
        let (other, _) = post(format!("{}/api/lights/plug/toggle", hub.url)).await;

        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(other, StatusCode::OK);
        assert_eq!(fake.is_on("strip"), Some(true));
    }

    #[tokio::test]
    async fn test_scene_reports_partial_success() {
        let (homebridge_url, fake) = fake_homebridge().await;
        let hub = start_hub(&homebridge_url, "strip,broken,plug").await;

        let (status, body) = post(format!("{}/api/scenes/all_on", hub.url)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scene"], "all_on");
        assert_eq!(body["affected"], 2);
        assert_eq!(body["errors"][0]["uniqueId"], "broken");
        assert_eq!(fake.is_on("strip"), Some(true));
        assert_eq!(fake.is_on("plug"), Some(true));

        let (again, body) = post(format!("{}/api/scenes/all_on", hub.url)).await;
        assert_eq!(again, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["detail"].as_str().unwrap().contains("all_on"));
    }

    #[tokio::test]
    async fn test_unconfigured_scene_is_400() {
        let (homebridge_url, fake) = fake_homebridge().await;
        let hub = start_hub(&homebridge_url, "").await;

        let (status, body) = post(format!("{}/api/scenes/movie", hub.url)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"detail": "SCENE_MOVIE_OFF_IDS not configured"}));
        assert!(fake.puts.lock().unwrap().is_empty());

        let (status, _) = post(format!("{}/api/scenes/movie", hub.url)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
