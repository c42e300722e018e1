//! ContentStore - annotated image storage on disk
//!
//! ## Responsibilities
//!
//! - Persist annotated detection images under `<data_dir>/uploads`
//! - Persist cleanup evidence photos under `<data_dir>/reports`
//! - Serve stored images by relative path, resolving only inside data_dir
//! - Bound every read and write with a per-operation deadline
//! - Content-type lookup by file extension

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::timeout;

/// ContentStore instance
pub struct ContentStore {
    /// Root data directory; all stored paths are relative to this
    data_dir: PathBuf,
    /// Deadline for a single filesystem read or write
    io_timeout: Duration,
}

impl ContentStore {
    /// Create new ContentStore
    ///
    /// Creates `uploads/` and `reports/` under the data directory if missing.
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        Self::with_timeout(data_dir, Duration::from_secs(10)).await
    }

    /// Create new ContentStore with custom I/O timeout
    ///
    /// A read or write that does not finish within the timeout resolves
    /// with [`Error::Timeout`] instead of hanging the request. The
    /// underlying filesystem operation may still complete afterwards.
    pub async fn with_timeout(data_dir: PathBuf, io_timeout: Duration) -> Result<Self> {
        fs::create_dir_all(data_dir.join("uploads")).await?;
        fs::create_dir_all(data_dir.join("reports")).await?;

        Ok(Self {
            data_dir,
            io_timeout,
        })
    }

    /// Root data directory
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Relative storage path for a detection image
    ///
    /// `"2025-01-15 10:30:00"` maps to
    /// `uploads/detection_2025-01-15_10-30-00.jpg`.
    pub fn image_path_for(timestamp: &str) -> String {
        format!("uploads/detection_{}.jpg", sanitize_key(timestamp))
    }

    /// Relative storage path for a cleanup report photo
    pub fn report_path_for(timestamp: &str) -> String {
        format!("reports/report_{}.jpg", sanitize_key(timestamp))
    }

    /// Relative storage path for an as-uploaded photo
    pub fn original_path_for(timestamp: &str) -> String {
        format!("uploads/photo_{}.jpg", sanitize_key(timestamp))
    }

    /// Write a detection image, returning its relative path
    pub async fn write(&self, timestamp: &str, data: &[u8]) -> Result<String> {
        let relative = Self::image_path_for(timestamp);
        self.write_relative(&relative, data).await?;
        Ok(relative)
    }

    /// Write a cleanup report photo, returning its relative path
    pub async fn write_report(&self, timestamp: &str, data: &[u8]) -> Result<String> {
        let relative = Self::report_path_for(timestamp);
        self.write_relative(&relative, data).await?;
        Ok(relative)
    }

    /// Write an as-uploaded photo, returning its relative path
    pub async fn write_original(&self, timestamp: &str, data: &[u8]) -> Result<String> {
        let relative = Self::original_path_for(timestamp);
        self.write_relative(&relative, data).await?;
        Ok(relative)
    }

    /// Read a stored image by its relative path
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>> {
        let path = self.resolve(relative)?;

        if !path.exists() {
            return Err(Error::NotFound(format!("Image not found: {}", relative)));
        }

        let data = timeout(self.io_timeout, fs::read(&path))
            .await
            .map_err(|_| Error::Timeout(format!("Image read timed out: {}", relative)))??;
        Ok(data)
    }

    /// Read the detection image stored for an event timestamp
    pub async fn read_by_key(&self, timestamp: &str) -> Result<Vec<u8>> {
        self.read(&Self::image_path_for(timestamp)).await
    }

    async fn write_relative(&self, relative: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(relative)?;
        timeout(self.io_timeout, fs::write(&path, data))
            .await
            .map_err(|_| Error::Timeout(format!("Image write timed out: {}", relative)))??;

        tracing::debug!(
            path = %path.display(),
            size = data.len(),
            "Stored image"
        );

        Ok(())
    }

    /// Resolve a relative path under data_dir, rejecting traversal
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if escapes || relative.is_empty() {
            return Err(Error::Validation(format!(
                "Invalid image path: {}",
                relative
            )));
        }

        Ok(self.data_dir.join(rel))
    }
}

/// Timestamp key as a filesystem-safe fragment (' ' to '_', ':' to '-')
fn sanitize_key(timestamp: &str) -> String {
    timestamp.replace(' ', "_").replace(':', "-")
}

/// Content type for a stored image path, by extension
pub fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/jpeg",
    }
}
