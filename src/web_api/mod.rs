//! WebAPI - HTTP endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes (web log panel, mobile client, REST, ingest)
//! - Request validation
//! - Response formatting (legacy-compatible shapes)

mod api_routes;
mod mobile_routes;
mod routes;

pub use routes::create_router;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{now_timestamp, HealthResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let detector_ok = state.detector.health_check().await.unwrap_or(false);
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        db_connected: db_ok,
        detector_connected: detector_ok,
    };

    Json(response)
}

/// Reachability check for the mobile client
pub async fn api_check(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let count = state.store.count().await?;

    Ok(Json(json!({
        "status": "success",
        "message": "API is reachable",
        "timestamp": now_timestamp(),
        "detection_count": count
    })))
}

/// Uploaded file plus the text fields of a multipart request
pub(crate) struct UploadForm {
    pub file: Option<Vec<u8>>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// Take a text field by name
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }
}

/// Drain a multipart body into the named file part and its text fields
pub(crate) async fn read_upload(mut multipart: Multipart, file_field: &str) -> Result<UploadForm> {
    let mut file = None;
    let mut fields = HashMap::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == file_field {
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::Validation(format!("Unreadable upload: {}", e)))?;
            file = Some(data.to_vec());
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| Error::Validation(format!("Unreadable field {}: {}", name, e)))?;
            fields.insert(name, value);
        }
    }

    Ok(UploadForm { file, fields })
}
