//! Binwatch Library
//!
//! Garbage-detection event server
//!
//! ## Architecture (7 Components)
//!
//! 1. EventStore - SQLite persistence for detection events
//! 2. CleanupClassifier - "flag for cleanup" cadence decision
//! 3. ZoneResolver - camera to zone/location mapping
//! 4. DetectorClient - detector sidecar adapter
//! 5. ContentStore - annotated image files on disk
//! 6. DetectionPipeline - one-frame ingest orchestration
//! 7. WebAPI - HTTP endpoints (web log, mobile, REST)
//!
//! ## Design Principles
//!
//! - Detection is delegated entirely to the external sidecar
//! - The event's `timestamp` string is its identity everywhere
//! - Store writes happen image-first, record-second

pub mod cleanup_classifier;
pub mod content_store;
pub mod detector_client;
pub mod error;
pub mod event_store;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod views;
pub mod web_api;
pub mod zone_resolver;

pub use error::{Error, Result};
pub use state::AppState;
