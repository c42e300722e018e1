//! Event Store types

use crate::zone_resolver::DEFAULT_CAMERA_ID;
use serde::{Deserialize, Serialize};

/// Detection event record (matches detection_events table)
///
/// `timestamp` is the natural key and the external API's event ID.
/// Optional fields model legacy rows where the column was never written;
/// absence is data, not an error, and read-side defaulting happens in the
/// view layer only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Wall-clock second, "%Y-%m-%d %H:%M:%S", unique across the store
    pub timestamp: String,

    /// Label from the fixed detector label set
    #[serde(rename = "class")]
    pub class_label: String,

    /// Detector confidence in (0.30, 1.0]
    pub confidence: f64,

    /// Lifecycle status, one-way pending -> cleaned
    pub status: DetectionStatus,

    /// Relative path of the stored annotated image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,

    /// Cleanup-workflow flag, decided once at creation
    #[serde(rename = "forCleaning", skip_serializing_if = "Option::is_none")]
    pub for_cleaning: Option<bool>,

    // Zone snapshot at creation time (denormalized, never re-resolved)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    // Populated only on transition to cleaned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleaned_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DetectionEvent {
    /// Synthetic pending event for the dev/test endpoints
    pub fn synthetic(
        timestamp: String,
        class_label: String,
        confidence: f64,
        zone_name: String,
        location: String,
    ) -> Self {
        Self {
            timestamp,
            class_label,
            confidence,
            status: DetectionStatus::Pending,
            image_path: None,
            for_cleaning: Some(true),
            camera_id: Some(DEFAULT_CAMERA_ID.to_string()),
            zone_name: Some(zone_name),
            location: Some(location),
            latitude: None,
            longitude: None,
            cleaned_by: None,
            cleaned_at: None,
            notes: None,
        }
    }
}

/// Detection lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionStatus {
    #[default]
    Pending,
    Cleaned,
}

impl DetectionStatus {
    /// Convert to the stored/wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionStatus::Pending => "pending",
            DetectionStatus::Cleaned => "cleaned",
        }
    }

    /// Parse from the stored/wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DetectionStatus::Pending),
            "cleaned" => Some(DetectionStatus::Cleaned),
            _ => None,
        }
    }
}

/// Retention policy enforced by the Event Store
///
/// Replaces the fixed in-memory cap of 100 rows: both knobs are optional
/// and retention is disabled entirely when neither is set.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Keep at most this many rows (newest win)
    pub max_count: Option<u32>,
    /// Delete rows older than this many hours
    pub max_age_hours: Option<i64>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_count: Some(100),
            max_age_hours: None,
        }
    }
}

impl RetentionPolicy {
    /// Policy that never deletes anything
    pub fn unbounded() -> Self {
        Self {
            max_count: None,
            max_age_hours: None,
        }
    }
}
