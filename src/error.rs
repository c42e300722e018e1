//! Error handling for the binwatch server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not found (unknown timestamp key, missing image file)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (missing field/file, malformed request)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Detector sidecar unreachable, errored, or timed out (transient)
    #[error("Detector unavailable: {0}")]
    DetectorUnavailable(String),

    /// Filesystem operation exceeded its deadline (transient)
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error (detector calls)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SQLx database error
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Error::DetectorUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Error::Timeout(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Error::Serialization(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Error::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            Error::Http(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            Error::Sqlx(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, message = %message, "Request error");
        } else {
            tracing::warn!(status = %status, message = %message, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}
