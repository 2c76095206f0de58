// Error types for the smartpanel hub.
// Covers upstream API failures, refresh failures, write-action rejections and configuration problems.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Invalid or missing API key")]
    InvalidApiKey,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out")]
    Timeout,

    #[error("Action '{0}' is cooling down, try again shortly")]
    CooldownActive(String),

    #[error("{0} not configured")]
    NotConfigured(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unexpected data: {0}")]
    InvalidData(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, HubError>;

impl HubError {
    /// HTTP status this error is reported with by the API layer.
    pub fn status_code(&self) -> StatusCode {
        match self {
            HubError::NotFound(_) => StatusCode::NOT_FOUND,
            HubError::CooldownActive(_) => StatusCode::TOO_MANY_REQUESTS,
            HubError::NotConfigured(_) => StatusCode::BAD_REQUEST,
            HubError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            HubError::Unauthorized
            | HubError::Http(_)
            | HubError::Upstream { .. }
            | HubError::Json(_)
            | HubError::Timeout
            | HubError::InvalidData(_) => StatusCode::BAD_GATEWAY,
            HubError::Io(_) | HubError::Config(_) | HubError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = %status, error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            HubError::NotFound("Accessory abc".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HubError::CooldownActive("movie".into()).status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            HubError::NotConfigured("SCENE_ALL_ON_IDS".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(HubError::Timeout.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(HubError::Timeout.to_string(), "timed out");
    }
}
