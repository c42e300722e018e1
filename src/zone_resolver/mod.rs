//! ZoneResolver - camera to zone/location mapping
//!
//! ## Responsibilities
//!
//! - Resolve camera_id to zone metadata, with Unknown fallbacks
//! - Apply one-shot per-request overrides (explicit parameter, nothing shared)
//! - Track the current-camera selector
//! - Best-effort coordinate extraction from location text

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tokio::sync::RwLock;

pub const UNKNOWN_ZONE: &str = "Unknown Zone";
pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const DEFAULT_CAMERA_ID: &str = "camera_0";

/// Zone metadata for one camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub zone_name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One-shot zone override for a single ingest call
///
/// Threaded through as an explicit parameter; nothing is stored, so
/// concurrent requests cannot see each other's overrides. Each present
/// field replaces the resolved value for this call only.
#[derive(Debug, Clone, Default)]
pub struct ZoneOverride {
    pub zone_name: Option<String>,
    pub location: Option<String>,
}

impl ZoneOverride {
    pub fn is_empty(&self) -> bool {
        self.zone_name.is_none() && self.location.is_none()
    }
}

/// Zone stamp for a new event
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedZone {
    pub zone_name: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Trailing "(lat, lng)" pair with signed decimals
fn coordinate_pattern() -> &'static Regex {
    static COORD_RE: OnceLock<Regex> = OnceLock::new();
    COORD_RE.get_or_init(|| {
        Regex::new(r"\(\s*(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)\s*\)\s*$")
            .expect("coordinate pattern")
    })
}

/// Extract latitude/longitude from a `"Name (lat, lng)"` location string
///
/// Best effort only: no bounds validation, unparseable text yields None.
pub fn extract_coordinates(location: &str) -> Option<(f64, f64)> {
    let caps = coordinate_pattern().captures(location)?;
    let latitude = caps[1].parse().ok()?;
    let longitude = caps[2].parse().ok()?;
    Some((latitude, longitude))
}

/// ZoneResolver instance
pub struct ZoneResolver {
    zones: RwLock<HashMap<String, ZoneInfo>>,
    current_camera: RwLock<String>,
}

impl ZoneResolver {
    /// Create new ZoneResolver over a zone map
    pub fn new(zones: HashMap<String, ZoneInfo>) -> Self {
        Self {
            zones: RwLock::new(zones),
            current_camera: RwLock::new(DEFAULT_CAMERA_ID.to_string()),
        }
    }

    /// Seed map matching the reference deployment
    pub fn seed_zones() -> HashMap<String, ZoneInfo> {
        let mut zones = HashMap::new();
        zones.insert(
            "camera_0".to_string(),
            ZoneInfo {
                zone_name: "Zone 1".to_string(),
                location: "Main Entrance".to_string(),
                description: Some("Camera monitoring the main entrance area".to_string()),
            },
        );
        zones
    }

    /// Load a zone map from a JSON file (`{"camera_id": {zone_name, ...}}`)
    pub fn load_zones_file(path: &Path) -> Result<HashMap<String, ZoneInfo>> {
        let raw = std::fs::read_to_string(path)?;
        let zones: HashMap<String, ZoneInfo> = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            cameras = zones.len(),
            "Loaded zone configuration"
        );
        Ok(zones)
    }

    /// Full zone map (for /mobile/get_zones)
    pub async fn zones(&self) -> HashMap<String, ZoneInfo> {
        self.zones.read().await.clone()
    }

    /// Currently selected camera
    pub async fn current_camera(&self) -> String {
        self.current_camera.read().await.clone()
    }

    /// Switch the current camera; unknown ids are rejected
    pub async fn set_camera(&self, camera_id: &str) -> bool {
        if !self.zones.read().await.contains_key(camera_id) {
            tracing::warn!(camera_id = %camera_id, "Rejected switch to unknown camera");
            return false;
        }

        let mut current = self.current_camera.write().await;
        *current = camera_id.to_string();
        tracing::info!(camera_id = %camera_id, "Current camera switched");
        true
    }

    /// Resolve the zone stamp for a new event
    ///
    /// Override fields win for this call only; otherwise the camera's
    /// configured zone applies, falling back to the Unknown placeholders.
    /// Coordinates are extracted from the final location text.
    pub async fn resolve(
        &self,
        camera_id: &str,
        zone_override: Option<&ZoneOverride>,
    ) -> ResolvedZone {
        let configured = self.zones.read().await.get(camera_id).cloned();

        let (mut zone_name, mut location) = match configured {
            Some(info) => (info.zone_name, info.location),
            None => (UNKNOWN_ZONE.to_string(), UNKNOWN_LOCATION.to_string()),
        };

        if let Some(over) = zone_override {
            if let Some(name) = &over.zone_name {
                zone_name = name.clone();
            }
            if let Some(loc) = &over.location {
                location = loc.clone();
            }
        }

        let (latitude, longitude) = match extract_coordinates(&location) {
            Some((lat, lng)) => (Some(lat), Some(lng)),
            None => (None, None),
        };

        ResolvedZone {
            zone_name,
            location,
            latitude,
            longitude,
        }
    }
}

impl Default for ZoneResolver {
    fn default() -> Self {
        Self::new(Self::seed_zones())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_known_camera() {
        let resolver = ZoneResolver::default();
        let zone = resolver.resolve("camera_0", None).await;
        assert_eq!(zone.zone_name, "Zone 1");
        assert_eq!(zone.location, "Main Entrance");
        assert_eq!(zone.latitude, None);
        assert_eq!(zone.longitude, None);
    }

    #[tokio::test]
    async fn test_resolve_unknown_camera_falls_back() {
        let resolver = ZoneResolver::default();
        let zone = resolver.resolve("camera_9", None).await;
        assert_eq!(zone.zone_name, UNKNOWN_ZONE);
        assert_eq!(zone.location, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn test_override_wins_for_single_call_only() {
        let resolver = ZoneResolver::default();
        let over = ZoneOverride {
            zone_name: Some("Pop-up Market".to_string()),
            location: Some("Riverside Walk".to_string()),
        };

        let zone = resolver.resolve("camera_0", Some(&over)).await;
        assert_eq!(zone.zone_name, "Pop-up Market");
        assert_eq!(zone.location, "Riverside Walk");

        // Nothing persisted for the next call.
        let next = resolver.resolve("camera_0", None).await;
        assert_eq!(next.zone_name, "Zone 1");
        assert_eq!(next.location, "Main Entrance");
    }

    #[tokio::test]
    async fn test_partial_override_keeps_configured_fields() {
        let resolver = ZoneResolver::default();
        let over = ZoneOverride {
            zone_name: None,
            location: Some("Loading Dock".to_string()),
        };

        let zone = resolver.resolve("camera_0", Some(&over)).await;
        assert_eq!(zone.zone_name, "Zone 1");
        assert_eq!(zone.location, "Loading Dock");
    }

    #[tokio::test]
    async fn test_coordinates_extracted_from_override_location() {
        let resolver = ZoneResolver::default();
        let over = ZoneOverride {
            zone_name: None,
            location: Some("Depot 4 (-6.2, 106.816666)".to_string()),
        };

        let zone = resolver.resolve("camera_0", Some(&over)).await;
        assert_eq!(zone.latitude, Some(-6.2));
        assert_eq!(zone.longitude, Some(106.816666));
        assert_eq!(zone.location, "Depot 4 (-6.2, 106.816666)");
    }

    #[tokio::test]
    async fn test_set_camera_validates_id() {
        let resolver = ZoneResolver::default();
        assert!(!resolver.set_camera("camera_9").await);
        assert_eq!(resolver.current_camera().await, "camera_0");

        let mut zones = ZoneResolver::seed_zones();
        zones.insert(
            "camera_1".to_string(),
            ZoneInfo {
                zone_name: "Zone 2".to_string(),
                location: "Back Alley".to_string(),
                description: None,
            },
        );
        let resolver = ZoneResolver::new(zones);
        assert!(resolver.set_camera("camera_1").await);
        assert_eq!(resolver.current_camera().await, "camera_1");
    }

    #[test]
    fn test_extract_coordinates_variants() {
        assert_eq!(
            extract_coordinates("Depot 4 (-6.2, 106.816666)"),
            Some((-6.2, 106.816666))
        );
        assert_eq!(extract_coordinates("Gate (7, -12)"), Some((7.0, -12.0)));
        assert_eq!(
            extract_coordinates("Spaced ( 1.5 , 2.5 ) "),
            Some((1.5, 2.5))
        );
        assert_eq!(extract_coordinates("Main Entrance"), None);
        assert_eq!(extract_coordinates("Bad pair (abc, 1)"), None);
        assert_eq!(extract_coordinates("Not at end (1, 2) extra"), None);
    }
}
