//! DetectorClient - detector sidecar adapter
//!
//! ## Responsibilities
//!
//! - Send frames to the detector sidecar for inference
//! - Parse detection responses (class index, confidence, bbox)
//! - Decode the optional annotated image
//! - Health checks
//!
//! The confidence threshold is applied by the caller, never here.

use crate::error::{Error, Result};
use base64::Engine;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One raw detection from the sidecar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_index: usize,
    pub confidence: f64,
    #[serde(default)]
    pub bbox: [f32; 4],
}

/// Detector response (sidecar /v1/detect schema)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub detections: Vec<RawDetection>,

    /// Base64-encoded annotated JPEG, when the sidecar renders one
    #[serde(default)]
    pub annotated_image: Option<String>,
}

impl DetectResponse {
    /// Decode the annotated image when present and valid
    pub fn decode_annotated(&self) -> Option<Vec<u8>> {
        let encoded = self.annotated_image.as_deref()?;
        match base64::engine::general_purpose::STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable annotated image");
                None
            }
        }
    }
}

/// Detector sidecar client
pub struct DetectorClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl DetectorClient {
    /// Create new detector client
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create new detector client with custom timeout
    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url,
            timeout,
        }
    }

    /// Check detector health
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Run detection on one frame
    ///
    /// Connection failures, timeouts, and non-success statuses all surface
    /// as `DetectorUnavailable`.
    pub async fn detect(&self, image: Vec<u8>) -> Result<DetectResponse> {
        let url = format!("{}/v1/detect", self.base_url);

        let form = Form::new().part(
            "image",
            Part::bytes(image)
                .file_name("frame.jpg")
                .mime_str("image/jpeg")?,
        );

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::DetectorUnavailable(format!("Detector request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::DetectorUnavailable(format!(
                "Detector returned {}: {}",
                status, body
            )));
        }

        let result: DetectResponse = resp.json().await.map_err(|e| {
            Error::DetectorUnavailable(format!("Detector response parse failed: {}", e))
        })?;

        Ok(result)
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
