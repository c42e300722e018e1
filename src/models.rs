//! Shared models and types for binwatch
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Fixed label set of the deployed detector model.
/// `class_index` values in detector responses index into this table.
pub const CLASS_LABELS: [&str; 6] = [
    "0",
    "c",
    "garbage",
    "garbage_bag",
    "sampah-detection",
    "trash",
];

/// Map a detector class index to its label
pub fn class_label(index: usize) -> Option<&'static str> {
    CLASS_LABELS.get(index).copied()
}

/// Wire format of event timestamps (second resolution, sortable)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current wall-clock time in the event timestamp format
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub db_connected: bool,
    pub detector_connected: bool,
}
