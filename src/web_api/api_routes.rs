//! REST detection routes
//!
//! Resource-style surface over the same store as the legacy endpoints.

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::read_upload;
use crate::error::{Error, Result};
use crate::event_store::DetectionStatus;
use crate::state::AppState;
use crate::views;
use crate::zone_resolver::ZoneOverride;

/// REST API router
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/detections", get(list_detections))
        .route("/api/detections", post(ingest_detection))
        .route("/api/detections/:timestamp", put(update_detection))
        .route("/api/detections/:timestamp", patch(update_detection))
}

/// All detections, fully defaulted
async fn list_detections(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let events = state.store.list().await?;
    let detections = views::full_log_view(&events, &state.config.public_base_url);

    Ok(Json(json!({
        "success": true,
        "detections": detections
    })))
}

/// Run the pipeline on an uploaded frame
async fn ingest_detection(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = read_upload(multipart, "image").await?;

    let image = form
        .file
        .take()
        .ok_or_else(|| Error::Validation("No image provided".to_string()))?;
    let camera_id = form.take("camera_id");
    let zone_override = ZoneOverride {
        zone_name: form.take("zone_name"),
        location: form.take("location"),
    };
    let over = if zone_override.is_empty() {
        None
    } else {
        Some(&zone_override)
    };

    let outcome = state
        .pipeline
        .ingest(image, camera_id.as_deref(), over)
        .await?;

    let mut body = json!({
        "success": true,
        "created": outcome.event.is_some()
    });
    if let Some(event) = outcome.event {
        body["detection"] = serde_json::to_value(event)?;
    }

    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
struct UpdateDetectionRequest {
    status: Option<String>,
    cleaned_by: Option<String>,
    notes: Option<String>,
}

/// Update one detection's status, echoing the stored row
async fn update_detection(
    State(state): State<AppState>,
    Path(timestamp): Path<String>,
    Json(req): Json<UpdateDetectionRequest>,
) -> Result<impl IntoResponse> {
    let status_raw = req
        .status
        .ok_or_else(|| Error::Validation("Status is required".to_string()))?;
    let status = DetectionStatus::parse(&status_raw)
        .ok_or_else(|| Error::Validation(format!("Unknown status: {}", status_raw)))?;

    let matched = state
        .store
        .update_status(
            &timestamp,
            status,
            req.cleaned_by.as_deref(),
            req.notes.as_deref(),
        )
        .await?;
    if !matched {
        return Err(Error::NotFound(format!("No detection at {}", timestamp)));
    }

    let detection = state
        .store
        .get(&timestamp)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No detection at {}", timestamp)))?;

    Ok(Json(json!({
        "success": true,
        "detection": detection
    })))
}
