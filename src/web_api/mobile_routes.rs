//! Mobile client routes
//!
//! The cleanup crew's app talks to these endpoints; request and response
//! shapes are frozen for compatibility (`cleanedBy` stays camelCase in
//! the status update body, `cleaned_by` stays snake_case elsewhere).

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::{Error, Result};
use crate::event_store::DetectionStatus;
use crate::models::now_timestamp;
use crate::state::AppState;
use crate::views;

/// Mobile API router
pub fn mobile_routes() -> Router<AppState> {
    Router::new()
        .route("/mobile/get_detections", get(get_detections))
        .route("/mobile/update_status", post(update_status))
        .route("/mobile/report_cleaned", post(report_cleaned))
        .route("/mobile/get_zones", get(get_zones))
        .route("/mobile/set_camera", post(set_camera))
        .route("/mobile_minimal", get(minimal))
}

/// Cleanup-pending events
async fn get_detections(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let events = state.store.list().await?;
    let detections = views::pending_view(&events, &state.config.public_base_url);

    Ok(Json(json!({
        "success": true,
        "detections": detections
    })))
}

#[derive(Debug, Deserialize)]
struct MobileUpdateStatusRequest {
    timestamp: Option<String>,
    status: Option<String>,
    #[serde(rename = "cleanedBy")]
    cleaned_by: Option<String>,
    notes: Option<String>,
}

/// Status update from the mobile app, reporting row match
async fn update_status(
    State(state): State<AppState>,
    Json(req): Json<MobileUpdateStatusRequest>,
) -> Result<impl IntoResponse> {
    let (Some(timestamp), Some(status_raw)) = (req.timestamp, req.status) else {
        return Err(Error::Validation("Invalid request data".to_string()));
    };
    let status = DetectionStatus::parse(&status_raw)
        .ok_or_else(|| Error::Validation(format!("Unknown status: {}", status_raw)))?;

    let updated = state
        .store
        .update_status(
            &timestamp,
            status,
            req.cleaned_by.as_deref(),
            req.notes.as_deref(),
        )
        .await?;

    Ok(Json(json!({ "success": updated })))
}

#[derive(Debug, Deserialize)]
struct ReportCleanedRequest {
    timestamp: Option<String>,
    cleaned_by: Option<String>,
    notes: Option<String>,
}

/// Mark one detection cleaned with audit fields
async fn report_cleaned(
    State(state): State<AppState>,
    Json(req): Json<ReportCleanedRequest>,
) -> Result<impl IntoResponse> {
    let timestamp = req
        .timestamp
        .ok_or_else(|| Error::Validation("Invalid request data".to_string()))?;
    let cleaned_by = req.cleaned_by.unwrap_or_else(|| "Unknown".to_string());
    let notes = req.notes.unwrap_or_default();

    let updated = state
        .store
        .update_status(
            &timestamp,
            DetectionStatus::Cleaned,
            Some(&cleaned_by),
            Some(&notes),
        )
        .await?;

    Ok(Json(json!({ "success": updated })))
}

/// Full camera zone map
async fn get_zones(State(state): State<AppState>) -> impl IntoResponse {
    let zones = state.resolver.zones().await;

    Json(json!({
        "success": true,
        "zones": zones
    }))
}

#[derive(Debug, Deserialize)]
struct SetCameraRequest {
    camera_id: Option<String>,
}

/// Switch the current camera
async fn set_camera(
    State(state): State<AppState>,
    Json(req): Json<SetCameraRequest>,
) -> Result<impl IntoResponse> {
    let camera_id = req
        .camera_id
        .ok_or_else(|| Error::Validation("Camera ID is required".to_string()))?;

    if !state.resolver.set_camera(&camera_id).await {
        return Err(Error::Validation("Invalid camera ID".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "camera_id": camera_id
    })))
}

/// Lightweight payload for slow connections: 3 newest events, 6 fields
async fn minimal(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let events = state.store.list().await?;
    let minimal_detections = views::minimal_view(&events);

    Ok(Json(json!({
        "success": true,
        "timestamp": now_timestamp(),
        "detection_count": events.len(),
        "minimal_detections": minimal_detections
    })))
}
