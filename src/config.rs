// Runtime settings for the hub.
// Loaded from environment variables (and an optional .env file) with per-source refresh schedules.

use std::time::Duration;

use tracing::{error, warn};

use crate::error::{HubError, Result};
use crate::refresh::{DEFAULT_COOLDOWN, DEFAULT_RESYNC_DELAY, SourceConfig};

pub const KEY_LIGHTS: &str = "lights";
pub const KEY_PIHOLE: &str = "pihole";
pub const KEY_NETWORK: &str = "network";
pub const KEY_WEATHER: &str = "weather";
pub const KEY_TODOS: &str = "todos";
pub const KEY_FITNESS: &str = "fitness";

/// Polling intervals in seconds, one per source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshIntervals {
    pub lights: u64,
    pub pihole: u64,
    pub network: u64,
    pub weather: u64,
    pub todos: u64,
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            lights: 15,
            pihole: 30,
            network: 60,
            weather: 3600,
            todos: 30,
        }
    }
}

/// All settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Shared secret for `X-API-KEY`; empty disables auth.
    pub api_key: String,
    pub host: String,
    pub port: u16,

    /// Empty when `HOMEBRIDGE_URL` is unset, which [`Settings::validate`] rejects.
    pub homebridge_url: String,
    pub homebridge_username: String,
    pub homebridge_password: String,

    pub pihole_url: String,
    pub pihole_api_token: String,

    pub router_ip: String,
    pub ping_target: String,
    pub dns_check_host: String,

    pub weather_lat: String,
    pub weather_lon: String,

    pub todos_file_path: String,

    pub scene_all_on_ids: Vec<String>,
    pub scene_movie_off_ids: Vec<String>,

    pub intervals: RefreshIntervals,
    pub action_cooldown: Duration,
    pub resync_delay: Duration,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let defaults = RefreshIntervals::default();

        Ok(Self {
            api_key: string("SMARTPANEL_API_KEY", ""),
            host: string("SMARTPANEL_HOST", "0.0.0.0"),
            port: parse_number(&lookup, "SMARTPANEL_PORT", 8100)?,

            homebridge_url: trim_url(&string("HOMEBRIDGE_URL", "")),
            homebridge_username: string("HOMEBRIDGE_USERNAME", "admin"),
            homebridge_password: string("HOMEBRIDGE_PASSWORD", ""),

            pihole_url: trim_url(&string("PIHOLE_URL", "http://localhost")),
            pihole_api_token: string("PIHOLE_API_TOKEN", ""),

            router_ip: string("ROUTER_IP", "192.168.1.1"),
            ping_target: string("PING_TARGET", "1.1.1.1"),
            dns_check_host: string("DNS_CHECK_HOST", "example.com"),

            weather_lat: string("WEATHER_LAT", "0"),
            weather_lon: string("WEATHER_LON", "0"),

            todos_file_path: string("TODOS_FILE_PATH", "/home/pi/todos.json"),

            scene_all_on_ids: csv_list(lookup("SCENE_ALL_ON_IDS").as_deref()),
            scene_movie_off_ids: csv_list(lookup("SCENE_MOVIE_OFF_IDS").as_deref()),

            intervals: RefreshIntervals {
                lights: parse_number(&lookup, "REFRESH_LIGHTS", defaults.lights)?,
                pihole: parse_number(&lookup, "REFRESH_PIHOLE", defaults.pihole)?,
                network: parse_number(&lookup, "REFRESH_NETWORK", defaults.network)?,
                weather: parse_number(&lookup, "REFRESH_WEATHER", defaults.weather)?,
                todos: parse_number(&lookup, "REFRESH_TODOS", defaults.todos)?,
            },
            action_cooldown: Duration::from_secs(parse_number(
                &lookup,
                "ACTION_COOLDOWN_SECS",
                DEFAULT_COOLDOWN.as_secs(),
            )?),
            resync_delay: Duration::from_secs(parse_number(
                &lookup,
                "RESYNC_DELAY_SECS",
                DEFAULT_RESYNC_DELAY.as_secs(),
            )?),
        })
    }

    /// Warn about settings that degrade individual sources; fail on fatal ones.
    ///
    /// Most problems only surface later as per-source cache errors, so the
    /// dashboard keeps working with partial data.
    pub fn validate(&self) -> Result<()> {
        if self.homebridge_password.is_empty() {
            warn!(
                var = "HOMEBRIDGE_PASSWORD",
                "missing env var: Homebridge refresh will fail without credentials"
            );
        }
        if self.pihole_api_token.is_empty() {
            warn!(
                var = "PIHOLE_API_TOKEN",
                "missing env var: Pi-hole stats may be incomplete without an API token"
            );
        }
        let coordinates = [
            ("WEATHER_LAT", &self.weather_lat),
            ("WEATHER_LON", &self.weather_lon),
        ];
        for (var, value) in coordinates {
            if value.is_empty() || value == "0" {
                warn!(var, "env var unset or default: weather data will be for lat=0/lon=0");
            }
        }

        if self.homebridge_url.is_empty() {
            error!(var = "HOMEBRIDGE_URL", "cannot reach Homebridge");
            return Err(HubError::Config("HOMEBRIDGE_URL is not set".to_string()));
        }
        Ok(())
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Refresh schedule for every polled source: interval, timeout and stagger.
    pub fn sources(&self) -> Vec<SourceConfig> {
        vec![
            SourceConfig::new(KEY_LIGHTS, self.intervals.lights),
            SourceConfig::new(KEY_PIHOLE, self.intervals.pihole)
                .with_initial_delay(Duration::from_secs(1)),
            SourceConfig::new(KEY_NETWORK, self.intervals.network)
                .with_timeout(Duration::from_secs(8))
                .with_initial_delay(Duration::from_secs(2)),
            SourceConfig::new(KEY_WEATHER, self.intervals.weather)
                .with_timeout(Duration::from_secs(10))
                .with_initial_delay(Duration::from_secs(3)),
            SourceConfig::new(KEY_TODOS, self.intervals.todos),
        ]
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| HubError::Config(format!("{key} must be a number, got '{raw}'"))),
        _ => Ok(default),
    }
}

/// Split a comma-separated list, dropping blanks.
fn csv_list(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
