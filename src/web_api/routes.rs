//! API Routes

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{api_routes::api_routes, mobile_routes::mobile_routes, read_upload};
use crate::content_store::content_type_for;
use crate::error::{Error, Result};
use crate::event_store::{DetectionEvent, DetectionStatus};
use crate::models::now_timestamp;
use crate::state::AppState;
use crate::views;
use crate::zone_resolver::ZoneOverride;

/// Upload size cap (the legacy clients post full-resolution photos)
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health & Status
        .route("/healthz", get(super::health_check))
        .route("/api_check", get(super::api_check))
        // Web log views
        .route("/get_detections", get(get_detections))
        .route("/get_logs", get(get_logs))
        .route("/update_status", post(update_status))
        // Ingest
        .route("/process_photo", post(process_photo))
        .route("/detect", post(detect))
        // Images & reports
        .route("/view_image/*image_path", get(view_image))
        .route("/get_detection_image/:timestamp", get(get_detection_image))
        .route("/upload_report", post(upload_report))
        // Dev helpers
        .route("/create_test_detection", get(create_test_detection))
        .route("/populate_test_data", get(populate_test_data))
        // Mobile client
        .merge(mobile_routes())
        // REST surface
        .merge(api_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

// ========================================
// Web Log Handlers
// ========================================

/// Raw stored events, newest first
async fn get_detections(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let events = state.store.list().await?;
    Ok(Json(events))
}

/// Full log view with image URLs and read-time defaults
async fn get_logs(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let events = state.store.list().await?;
    let logs = views::full_log_view(&events, &state.config.public_base_url);

    tracing::debug!(count = logs.len(), "Serving log view");
    Ok(Json(logs))
}

#[derive(Debug, Deserialize)]
struct UpdateStatusRequest {
    timestamp: Option<String>,
    status: Option<String>,
}

/// Status update from the web log panel
///
/// The panel expects plain acceptance; row match is reported only on the
/// mobile and REST surfaces.
async fn update_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse> {
    let (Some(timestamp), Some(status_raw)) = (req.timestamp, req.status) else {
        return Err(Error::Validation("Invalid request data".to_string()));
    };
    let status = DetectionStatus::parse(&status_raw)
        .ok_or_else(|| Error::Validation(format!("Unknown status: {}", status_raw)))?;

    state
        .store
        .update_status(&timestamp, status, None, None)
        .await?;

    Ok(Json(json!({ "success": true })))
}

// ========================================
// Ingest Handlers
// ========================================

/// Photo upload with optional one-shot zone override fields
async fn process_photo(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = read_upload(multipart, "photo").await?;

    let photo = form
        .file
        .take()
        .ok_or_else(|| Error::Validation("No photo uploaded".to_string()))?;
    if photo.is_empty() {
        return Err(Error::Validation("No selected file".to_string()));
    }

    let zone_override = ZoneOverride {
        zone_name: form.take("zone_name"),
        location: form.take("location"),
    };
    let over = if zone_override.is_empty() {
        None
    } else {
        Some(&zone_override)
    };

    let outcome = state.pipeline.ingest(photo.clone(), None, over).await?;

    // The panel links both files, detection or not.
    let original_path = state
        .content
        .write_original(&outcome.timestamp, &photo)
        .await?;
    let processed_path = match outcome.event.as_ref().and_then(|e| e.image_path.clone()) {
        Some(path) => path,
        None => {
            state
                .content
                .write(&outcome.timestamp, &outcome.annotated)
                .await?
        }
    };
    let processed_image = processed_path
        .rsplit('/')
        .next()
        .unwrap_or(&processed_path)
        .to_string();

    Ok(Json(json!({
        "success": true,
        "original_path": original_path,
        "processed_path": processed_path,
        "processed_image": processed_image
    })))
}

/// Bare frame ingest (camera relay clients)
async fn detect(State(state): State<AppState>, multipart: Multipart) -> Result<impl IntoResponse> {
    let form = read_upload(multipart, "image").await?;
    let image = form
        .file
        .ok_or_else(|| Error::Validation("No image provided".to_string()))?;

    let outcome = state.pipeline.ingest(image, None, None).await?;

    match outcome.event {
        Some(event) => Ok(Json(json!({
            "success": true,
            "garbage_detected": true,
            "detection": event
        }))),
        None => Ok(Json(json!({
            "success": true,
            "garbage_detected": false
        }))),
    }
}

// ========================================
// Image & Report Handlers
// ========================================

/// Serve a stored image by its relative path
async fn view_image(
    State(state): State<AppState>,
    Path(image_path): Path<String>,
) -> Result<impl IntoResponse> {
    let data = state.content.read(&image_path).await?;
    let content_type = content_type_for(&image_path);

    Ok(([(header::CONTENT_TYPE, content_type)], data))
}

/// Serve the annotated image of one event by timestamp
async fn get_detection_image(
    State(state): State<AppState>,
    Path(timestamp): Path<String>,
) -> Result<impl IntoResponse> {
    let event = state
        .store
        .get(&timestamp)
        .await?
        .ok_or_else(|| Error::NotFound(format!("No detection at {}", timestamp)))?;
    let image_path = event
        .image_path
        .ok_or_else(|| Error::NotFound("Image not found".to_string()))?;

    let data = state.content.read(&image_path).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&image_path))], data))
}

/// Cleanup evidence photo from the mobile client
async fn upload_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut form = read_upload(multipart, "image").await?;

    let image = form
        .file
        .take()
        .ok_or_else(|| Error::Validation("No image provided".to_string()))?;
    let timestamp = form.take("timestamp").unwrap_or_else(now_timestamp);
    let latitude = form.take("latitude").unwrap_or_else(|| "unknown".to_string());
    let longitude = form.take("longitude").unwrap_or_else(|| "unknown".to_string());

    let path = state.content.write_report(&timestamp, &image).await?;
    let file_name = path.rsplit('/').next().unwrap_or(&path).to_string();

    tracing::info!(timestamp = %timestamp, path = %path, "Cleanup report stored");

    Ok(Json(json!({
        "success": true,
        "report": {
            "timestamp": timestamp,
            "image": file_name,
            "latitude": latitude,
            "longitude": longitude,
            "status": "cleaned"
        }
    })))
}

// ========================================
// Dev Helpers
// ========================================

/// Insert one synthetic pending event
async fn create_test_detection(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let event = DetectionEvent::synthetic(
        now_timestamp(),
        "test_garbage".to_string(),
        0.95,
        "Test Zone".to_string(),
        "Test Location".to_string(),
    );
    state.store.put(&event).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Test detection created",
        "detection": event
    })))
}

/// Reset the store and insert 5 synthetic events spaced 5 minutes apart
async fn populate_test_data(State(state): State<AppState>) -> Result<impl IntoResponse> {
    state.store.clear().await?;
    let detections = state.store.seed_test_rows(5).await?;

    Ok(Json(json!({
        "status": "success",
        "message": format!("Created {} test detections", detections.len()),
        "detections": detections
    })))
}
