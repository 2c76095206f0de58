// API key middleware.
// Every route except the health check requires a matching X-API-KEY header when a key is configured.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::{HubError, Result};

use super::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Paths served without a key.
const OPEN_PATHS: &[&str] = &["/healthz"];

pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let expected = state.settings.api_key.as_str();
    if expected.is_empty() || OPEN_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if provided != Some(expected) {
        return Err(HubError::InvalidApiKey);
    }
    Ok(next.run(req).await)
}
