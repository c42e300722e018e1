//! Read-time views over stored detection events
//!
//! ## Responsibilities
//!
//! - Full log view: every stored field, read-time defaults, image URLs
//! - Cleanup-pending view for the mobile client
//! - Minimal view: at most the 3 most-recent events, 6 fields each
//!
//! All views are pure projections over an already-ordered event list;
//! defaulting happens in the response only and never writes back.

use crate::event_store::{DetectionEvent, DetectionStatus};
use crate::zone_resolver::{DEFAULT_CAMERA_ID, UNKNOWN_LOCATION, UNKNOWN_ZONE};
use serde::Serialize;

/// Number of events served by the minimal view
pub const MINIMAL_VIEW_LIMIT: usize = 3;

/// Public URL for a stored image path
pub fn image_url(public_base_url: &str, image_path: &str) -> String {
    format!(
        "{}/view_image/{}",
        public_base_url.trim_end_matches('/'),
        image_path
    )
}

/// Fully-defaulted event as served by the web log view
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub timestamp: String,
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f64,
    pub status: DetectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "forCleaning")]
    pub for_cleaning: bool,
    pub camera_id: String,
    pub zone_name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Event as served by the cleanup-pending view (stored shape plus URL)
#[derive(Debug, Clone, Serialize)]
pub struct PendingEventView {
    #[serde(flatten)]
    pub event: DetectionEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Event as served by the minimal view
#[derive(Debug, Clone, Serialize)]
pub struct MinimalEventView {
    pub timestamp: String,
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f64,
    pub status: DetectionStatus,
    pub zone_name: String,
    pub location: String,
}

/// Full log view: every event, read-time defaults applied
pub fn full_log_view(events: &[DetectionEvent], public_base_url: &str) -> Vec<EventView> {
    events
        .iter()
        .map(|e| EventView {
            timestamp: e.timestamp.clone(),
            class_label: e.class_label.clone(),
            confidence: e.confidence,
            status: e.status,
            image_url: e
                .image_path
                .as_deref()
                .map(|p| image_url(public_base_url, p)),
            image_path: e.image_path.clone(),
            for_cleaning: e.for_cleaning.unwrap_or(true),
            camera_id: e
                .camera_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CAMERA_ID.to_string()),
            zone_name: e
                .zone_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_ZONE.to_string()),
            location: e
                .location
                .clone()
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
            latitude: e.latitude,
            longitude: e.longitude,
            cleaned_by: e.cleaned_by.clone(),
            cleaned_at: e.cleaned_at.clone(),
            notes: e.notes.clone(),
        })
        .collect()
}

/// Cleanup-pending view: events flagged for cleaning
///
/// Rows predating the flag column carry no value and are treated as
/// flagged, so legacy detections stay visible to the cleanup crew.
pub fn pending_view(events: &[DetectionEvent], public_base_url: &str) -> Vec<PendingEventView> {
    events
        .iter()
        .filter(|e| e.for_cleaning.unwrap_or(true))
        .map(|e| PendingEventView {
            image_url: e
                .image_path
                .as_deref()
                .map(|p| image_url(public_base_url, p)),
            event: e.clone(),
        })
        .collect()
}

/// Minimal view: at most the 3 most-recent events, 6 fields each
pub fn minimal_view(events: &[DetectionEvent]) -> Vec<MinimalEventView> {
    events
        .iter()
        .take(MINIMAL_VIEW_LIMIT)
        .map(|e| MinimalEventView {
            timestamp: e.timestamp.clone(),
            class_label: e.class_label.clone(),
            confidence: e.confidence,
            status: e.status,
            zone_name: e
                .zone_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_ZONE.to_string()),
            location: e
                .location
                .clone()
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_event(timestamp: &str) -> DetectionEvent {
        DetectionEvent {
            timestamp: timestamp.to_string(),
            class_label: "garbage".to_string(),
            confidence: 0.9,
            status: DetectionStatus::Pending,
            image_path: None,
            for_cleaning: None,
            camera_id: None,
            zone_name: None,
            location: None,
            latitude: None,
            longitude: None,
            cleaned_by: None,
            cleaned_at: None,
            notes: None,
        }
    }

    fn full_event(timestamp: &str, for_cleaning: bool) -> DetectionEvent {
        DetectionEvent {
            image_path: Some(format!(
                "uploads/detection_{}.jpg",
                timestamp.replace(' ', "_").replace(':', "-")
            )),
            for_cleaning: Some(for_cleaning),
            camera_id: Some("camera_0".to_string()),
            zone_name: Some("Zone 1".to_string()),
            location: Some("Main Entrance".to_string()),
            ..legacy_event(timestamp)
        }
    }

    #[test]
    fn test_image_url_joins_base_and_path() {
        assert_eq!(
            image_url("http://localhost:5000", "uploads/detection_x.jpg"),
            "http://localhost:5000/view_image/uploads/detection_x.jpg"
        );
        assert_eq!(
            image_url("http://localhost:5000/", "uploads/detection_x.jpg"),
            "http://localhost:5000/view_image/uploads/detection_x.jpg"
        );
    }

    #[test]
    fn test_full_view_defaults_legacy_fields() {
        let stored = vec![legacy_event("2024-01-01 10:00:00")];
        let view = full_log_view(&stored, "http://localhost:5000");

        assert_eq!(view.len(), 1);
        assert!(view[0].for_cleaning);
        assert_eq!(view[0].camera_id, "camera_0");
        assert_eq!(view[0].zone_name, "Unknown Zone");
        assert_eq!(view[0].location, "Unknown Location");
        assert!(view[0].image_url.is_none());

        // Defaulting is read-time only.
        assert_eq!(stored[0].for_cleaning, None);
        assert_eq!(stored[0].zone_name, None);
    }

    #[test]
    fn test_full_view_derives_image_url() {
        let stored = vec![full_event("2024-01-01 10:00:00", true)];
        let view = full_log_view(&stored, "http://localhost:5000");

        assert_eq!(
            view[0].image_url.as_deref(),
            Some("http://localhost:5000/view_image/uploads/detection_2024-01-01_10-00-00.jpg")
        );
        assert_eq!(
            view[0].image_path.as_deref(),
            Some("uploads/detection_2024-01-01_10-00-00.jpg")
        );
    }

    #[test]
    fn test_full_view_wire_names() {
        let stored = vec![legacy_event("2024-01-01 10:00:00")];
        let json = serde_json::to_value(full_log_view(&stored, "http://x")).unwrap();
        let obj = &json[0];

        assert_eq!(obj["class"], "garbage");
        assert_eq!(obj["forCleaning"], true);
        assert_eq!(obj["status"], "pending");
        assert!(obj.get("class_label").is_none());
    }

    #[test]
    fn test_pending_view_filters_and_keeps_legacy_rows() {
        let stored = vec![
            full_event("2024-01-01 10:02:00", true),
            full_event("2024-01-01 10:01:00", false),
            legacy_event("2024-01-01 10:00:00"),
        ];

        let view = pending_view(&stored, "http://localhost:5000");
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].event.timestamp, "2024-01-01 10:02:00");
        assert_eq!(view[1].event.timestamp, "2024-01-01 10:00:00");
        assert!(view[0].image_url.is_some());
        assert!(view[1].image_url.is_none());
    }

    #[test]
    fn test_minimal_view_caps_at_three() {
        let stored: Vec<_> = (0..5)
            .map(|i| full_event(&format!("2024-01-01 10:0{}:00", 9 - i), true))
            .collect();

        let view = minimal_view(&stored);
        assert_eq!(view.len(), 3);
        assert_eq!(view[0].timestamp, "2024-01-01 10:09:00");
        assert_eq!(view[2].timestamp, "2024-01-01 10:07:00");
    }

    #[test]
    fn test_minimal_view_projects_six_fields() {
        let stored = vec![legacy_event("2024-01-01 10:00:00")];
        let json = serde_json::to_value(minimal_view(&stored)).unwrap();
        let obj = json[0].as_object().unwrap();

        assert_eq!(obj.len(), 6);
        for key in ["timestamp", "class", "confidence", "status", "zone_name", "location"] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(obj["zone_name"], "Unknown Zone");
    }
}
