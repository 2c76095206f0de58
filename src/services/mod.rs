// Data source clients.
// Each source becomes a fetcher for one cache key; Homebridge also serves write actions.

pub mod homebridge;
pub mod network;
pub mod pihole;
pub mod todos;
pub mod weather;

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};

use crate::config::{KEY_LIGHTS, KEY_NETWORK, KEY_PIHOLE, KEY_TODOS, KEY_WEATHER, Settings};
use crate::error::{HubError, Result};
use crate::refresh::{Fetcher, RefreshTask};

pub use homebridge::HomebridgeClient;
pub use network::NetworkChecker;
pub use pihole::PiholeClient;
pub use todos::TodosReader;
pub use weather::WeatherClient;

/// Check response status and convert errors.
pub(crate) async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::UNAUTHORIZED => Err(HubError::Unauthorized),
        StatusCode::NOT_FOUND => Err(HubError::NotFound(response.url().to_string())),
        status => Err(HubError::Upstream {
            status,
            body: response.text().await.unwrap_or_default(),
        }),
    }
}

/// Fetcher for a cache key, or `None` if the key has no polled source.
pub fn fetcher_for(
    key: &str,
    settings: &Settings,
    http: &Client,
    homebridge: &Arc<HomebridgeClient>,
) -> Option<Fetcher> {
    let fetcher = match key {
        KEY_LIGHTS => {
            let homebridge = homebridge.clone();
            Fetcher::json(move || {
                let homebridge = homebridge.clone();
                async move { homebridge.fetch_lights().await }
            })
        }
        KEY_PIHOLE => {
            let pihole = PiholeClient::from_settings(http.clone(), settings);
            Fetcher::json(move || {
                let pihole = pihole.clone();
                async move { pihole.fetch_status().await }
            })
        }
        KEY_NETWORK => {
            let checker = NetworkChecker::from_settings(settings);
            Fetcher::json(move || {
                let checker = checker.clone();
                async move { checker.check_all().await }
            })
        }
        KEY_WEATHER => {
            let weather = WeatherClient::from_settings(http.clone(), settings);
            Fetcher::json(move || {
                let weather = weather.clone();
                async move { weather.fetch_today().await }
            })
        }
        KEY_TODOS => {
            let todos = TodosReader::from_settings(settings);
            Fetcher::json(move || {
                let todos = todos.clone();
                async move { todos.read().await }
            })
        }
        _ => return None,
    };
    Some(fetcher)
}

/// One refresh task per configured source.
pub fn refresh_tasks(
    settings: &Settings,
    http: &Client,
    homebridge: &Arc<HomebridgeClient>,
) -> Vec<RefreshTask> {
    settings
        .sources()
        .into_iter()
        .filter_map(|config| {
            let fetcher = fetcher_for(&config.key, settings, http, homebridge)?;
            Some(RefreshTask::new(config, fetcher))
        })
        .collect()
}
