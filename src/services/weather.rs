// Open-Meteo weather client (no API key required).
// Fetches current temperature, today's range, rain chance, sunrise and sunset.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::Result;

use super::check_response;

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

const DAILY_FIELDS: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_probability_max,sunrise,sunset";

#[derive(Debug, Default, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    current: CurrentWeather,
    #[serde(default)]
    daily: DailyForecast,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentWeather {
    temperature_2m: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DailyForecast {
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    precipitation_probability_max: Vec<Option<f64>>,
    sunrise: Vec<Option<String>>,
    sunset: Vec<Option<String>>,
}

/// Today's summary served from the `weather` cache entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WeatherToday {
    pub temperature_c: Option<f64>,
    pub high_c: Option<f64>,
    pub low_c: Option<f64>,
    pub precipitation_chance: Option<f64>,
    /// Local time, ISO 8601 without offset.
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

fn first<T: Clone>(values: &[Option<T>]) -> Option<T> {
    values.first().cloned().flatten()
}

impl From<ForecastResponse> for WeatherToday {
    fn from(forecast: ForecastResponse) -> Self {
        let daily = &forecast.daily;
        Self {
            temperature_c: forecast.current.temperature_2m,
            high_c: first(&daily.temperature_2m_max),
            low_c: first(&daily.temperature_2m_min),
            precipitation_chance: first(&daily.precipitation_probability_max),
            sunrise: first(&daily.sunrise),
            sunset: first(&daily.sunset),
        }
    }
}

/// Forecast client for one fixed location.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    url: String,
    latitude: String,
    longitude: String,
}

impl WeatherClient {
    pub fn new(client: Client, latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            client,
            url: OPEN_METEO_URL.to_string(),
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }

    pub fn from_settings(client: Client, settings: &Settings) -> Self {
        Self::new(
            client,
            settings.weather_lat.clone(),
            settings.weather_lon.clone(),
        )
    }

    #[cfg(test)]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Fetch today's weather summary.
    pub async fn fetch_today(&self) -> Result<WeatherToday> {
        let params = [
            ("latitude", self.latitude.as_str()),
            ("longitude", self.longitude.as_str()),
            ("current", "temperature_2m"),
            ("daily", DAILY_FIELDS),
            ("timezone", "auto"),
            ("forecast_days", "1"),
        ];
        let response = self.client.get(&self.url).query(&params).send().await?;
        let forecast: ForecastResponse = check_response(response).await?.json().await?;
        Ok(forecast.into())
    }
}
