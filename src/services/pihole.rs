// Pi-hole admin API client (v5 `/admin/api.php`).
// Fetches the daily summary and normalises its loosely typed fields.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::Settings;
use crate::error::{HubError, Result};

use super::check_response;

/// Summary served from the `pihole` cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PiholeStatus {
    pub status: String,
    pub queries_today: u64,
    pub blocked_today: u64,
    pub percent_blocked: f64,
    /// Unix time of the last gravity update.
    pub gravity_last_updated: Option<i64>,
}

impl PiholeStatus {
    /// Build from a raw summary response.
    ///
    /// Pi-hole formats some numbers as strings ("12,345"); both forms are accepted.
    pub fn from_summary(summary: &Map<String, Value>) -> Result<Self> {
        let gravity_last_updated = summary
            .get("gravity_last_updated")
            .and_then(Value::as_object)
            .and_then(|gravity| gravity.get("absolute"))
            .and_then(Value::as_i64);

        Ok(Self {
            status: summary
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            queries_today: number_field(summary, "dns_queries_today")? as u64,
            blocked_today: number_field(summary, "ads_blocked_today")? as u64,
            percent_blocked: number_field(summary, "ads_percentage_today")?,
            gravity_last_updated,
        })
    }
}

/// Read a numeric field that may be absent (0), a number, or a formatted string.
fn number_field(summary: &Map<String, Value>, field: &str) -> Result<f64> {
    let invalid = || HubError::InvalidData(format!("Pi-hole field {field} is not a number"));
    match summary.get(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid),
        Some(Value::String(s)) => s.replace(',', "").trim().parse().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

/// Client for one Pi-hole instance.
#[derive(Debug, Clone)]
pub struct PiholeClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl PiholeClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_token: api_token.into(),
        }
    }

    pub fn from_settings(client: Client, settings: &Settings) -> Self {
        Self::new(
            client,
            settings.pihole_url.clone(),
            settings.pihole_api_token.clone(),
        )
    }

    /// Fetch today's summary stats.
    pub async fn fetch_status(&self) -> Result<PiholeStatus> {
        let mut params = vec![("summary", "")];
        if !self.api_token.is_empty() {
            params.push(("auth", self.api_token.as_str()));
        }

        let response = self
            .client
            .get(format!("{}/admin/api.php", self.base_url))
            .query(&params)
            .send()
            .await?;
        let summary: Map<String, Value> = check_response(response).await?.json().await?;
        PiholeStatus::from_summary(&summary)
    }
}
