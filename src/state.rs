//! Application state
//!
//! Holds all shared components and state

use crate::cleanup_classifier::{CleanupClassifier, CooldownScope};
use crate::content_store::ContentStore;
use crate::detector_client::DetectorClient;
use crate::event_store::EventStore;
use crate::pipeline::DetectionPipeline;
use crate::zone_resolver::ZoneResolver;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Database URL
    pub database_url: String,
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Base URL used when deriving image links
    pub public_base_url: String,
    /// Root directory for stored images
    pub data_dir: PathBuf,
    /// Detector sidecar URL
    pub detector_url: String,
    /// Detector request timeout in seconds
    pub detector_timeout_sec: u64,
    /// Image read/write timeout in seconds
    pub io_timeout_sec: u64,
    /// Cleanup cooldown length in seconds
    pub cleanup_cooldown_sec: u64,
    /// Cooldown keying (global | per_camera)
    pub cleanup_cooldown_scope: CooldownScope,
    /// Keep at most this many events (0 disables the cap)
    pub retention_max_count: Option<u32>,
    /// Delete events older than this many hours (unset disables)
    pub retention_max_age_hours: Option<i64>,
    /// Seconds between periodic retention sweeps
    pub retention_sweep_interval_sec: u64,
    /// Optional zone map JSON file
    pub zones_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://binwatch.db".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://{}:{}", host, port)),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            detector_url: std::env::var("DETECTOR_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8790".to_string()),
            detector_timeout_sec: std::env::var("DETECTOR_TIMEOUT_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            io_timeout_sec: std::env::var("IO_TIMEOUT_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            cleanup_cooldown_sec: std::env::var("CLEANUP_COOLDOWN_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            cleanup_cooldown_scope: std::env::var("CLEANUP_COOLDOWN_SCOPE")
                .ok()
                .and_then(|v| CooldownScope::parse(&v))
                .unwrap_or_default(),
            retention_max_count: match std::env::var("RETENTION_MAX_COUNT") {
                Ok(v) => v.parse().ok().filter(|n| *n > 0),
                Err(_) => Some(100),
            },
            retention_max_age_hours: std::env::var("RETENTION_MAX_AGE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok()),
            retention_sweep_interval_sec: std::env::var("RETENTION_SWEEP_INTERVAL_SEC")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            zones_file: std::env::var("ZONES_FILE").ok().map(PathBuf::from),
            host,
            port,
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database pool
    pub pool: SqlitePool,
    /// Application config
    pub config: AppConfig,
    /// EventStore (SQLite persistence)
    pub store: Arc<EventStore>,
    /// DetectorClient (sidecar adapter)
    pub detector: Arc<DetectorClient>,
    /// CleanupClassifier (cooldown cadence)
    pub classifier: Arc<CleanupClassifier>,
    /// ZoneResolver (camera to zone map)
    pub resolver: Arc<ZoneResolver>,
    /// ContentStore (annotated image files)
    pub content: Arc<ContentStore>,
    /// DetectionPipeline (one-frame ingest)
    pub pipeline: Arc<DetectionPipeline>,
}
