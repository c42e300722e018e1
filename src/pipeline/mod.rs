//! DetectionPipeline - one-frame ingest orchestration
//!
//! ## Responsibilities
//!
//! - Run the detector on an inbound frame (no store exclusion held)
//! - Filter detections by the confidence threshold, keep the top one
//! - Decide the cleanup flag and resolve the zone snapshot
//! - Persist image first, record second
//! - Hand the cooldown claim back when persisting fails

use crate::cleanup_classifier::CleanupClassifier;
use crate::content_store::ContentStore;
use crate::detector_client::{DetectorClient, RawDetection};
use crate::error::{Error, Result};
use crate::event_store::{DetectionEvent, DetectionStatus, EventStore};
use crate::models::{class_label, now_timestamp};
use crate::zone_resolver::{ZoneOverride, ZoneResolver};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Minimum confidence for an event to be created (strictly above)
pub const CONFIDENCE_THRESHOLD: f64 = 0.30;

/// Outcome of one ingest call
#[derive(Debug)]
pub struct IngestOutcome {
    /// Wall-clock stamp assigned to this frame
    pub timestamp: String,
    /// Created event, when a detection cleared the threshold
    pub event: Option<DetectionEvent>,
    /// Annotated frame bytes (detector render when provided, original otherwise)
    pub annotated: Vec<u8>,
}

/// DetectionPipeline instance
pub struct DetectionPipeline {
    detector: Arc<DetectorClient>,
    store: Arc<EventStore>,
    classifier: Arc<CleanupClassifier>,
    resolver: Arc<ZoneResolver>,
    content: Arc<ContentStore>,
}

impl DetectionPipeline {
    /// Create new DetectionPipeline
    pub fn new(
        detector: Arc<DetectorClient>,
        store: Arc<EventStore>,
        classifier: Arc<CleanupClassifier>,
        resolver: Arc<ZoneResolver>,
        content: Arc<ContentStore>,
    ) -> Self {
        Self {
            detector,
            store,
            classifier,
            resolver,
            content,
        }
    }

    /// Ingest one frame
    ///
    /// Calls the detector before touching any shared state, then records
    /// an event for the top detection above threshold. `camera_id` falls
    /// back to the resolver's current camera; `zone_override` applies to
    /// this call only.
    pub async fn ingest(
        &self,
        image: Vec<u8>,
        camera_id: Option<&str>,
        zone_override: Option<&ZoneOverride>,
    ) -> Result<IngestOutcome> {
        let response = self.detector.detect(image.clone()).await?;
        let annotated = response.decode_annotated().unwrap_or(image);

        self.record(response.detections, annotated, camera_id, zone_override)
            .await
    }

    /// Record the detector output for one frame
    async fn record(
        &self,
        detections: Vec<RawDetection>,
        annotated: Vec<u8>,
        camera_id: Option<&str>,
        zone_override: Option<&ZoneOverride>,
    ) -> Result<IngestOutcome> {
        let timestamp = now_timestamp();

        let Some(top) = select_top(&detections) else {
            tracing::debug!(
                timestamp = %timestamp,
                candidates = detections.len(),
                "No detection above threshold"
            );
            return Ok(IngestOutcome {
                timestamp,
                event: None,
                annotated,
            });
        };

        let label = class_label(top.class_index).ok_or_else(|| {
            Error::DetectorUnavailable(format!(
                "Detector returned unknown class index {}",
                top.class_index
            ))
        })?;

        let camera = match camera_id {
            Some(id) => id.to_string(),
            None => self.resolver.current_camera().await,
        };

        let decided_at = Utc::now();
        let for_cleaning = self.classifier.decide_at(&camera, decided_at).await;
        let zone = self.resolver.resolve(&camera, zone_override).await;

        // Image first, record second: a record must never reference a
        // missing image.
        let image_path = match self.content.write(&timestamp, &annotated).await {
            Ok(path) => path,
            Err(e) => {
                self.release_claim(for_cleaning, &camera, decided_at).await;
                return Err(e);
            }
        };

        let event = DetectionEvent {
            timestamp: timestamp.clone(),
            class_label: label.to_string(),
            confidence: top.confidence,
            status: DetectionStatus::Pending,
            image_path: Some(image_path),
            for_cleaning: Some(for_cleaning),
            camera_id: Some(camera.clone()),
            zone_name: Some(zone.zone_name),
            location: Some(zone.location),
            latitude: zone.latitude,
            longitude: zone.longitude,
            cleaned_by: None,
            cleaned_at: None,
            notes: None,
        };

        if let Err(e) = self.store.put(&event).await {
            self.release_claim(for_cleaning, &camera, decided_at).await;
            return Err(e);
        }

        tracing::info!(
            timestamp = %event.timestamp,
            class = %event.class_label,
            confidence = event.confidence,
            for_cleaning = for_cleaning,
            "Detection event recorded"
        );

        Ok(IngestOutcome {
            timestamp,
            event: Some(event),
            annotated,
        })
    }

    /// Hand a claimed cooldown window back after a persist failure, so
    /// the cleanup flag is not lost for the rest of the window
    async fn release_claim(&self, for_cleaning: bool, camera: &str, claimed_at: DateTime<Utc>) {
        if for_cleaning {
            self.classifier.reopen(camera, claimed_at).await;
        }
    }
}

/// Highest-confidence detection strictly above the threshold
fn select_top(detections: &[RawDetection]) -> Option<&RawDetection> {
    detections
        .iter()
        .filter(|d| d.confidence > CONFIDENCE_THRESHOLD)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}
