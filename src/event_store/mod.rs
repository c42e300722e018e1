//! EventStore - Detection Event Persistence
//!
//! ## Responsibilities
//!
//! - Persist detection events to SQLite (detection_events table)
//! - Upsert by natural key (timestamp) for dedup
//! - One-way status transitions with cleanup audit stamps
//! - Retention enforcement (max count / max age)

mod types;

pub use types::*;

use crate::error::Result;
use crate::models::{now_timestamp, TIMESTAMP_FORMAT};
use chrono::{Duration, Local};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// EventStore instance
pub struct EventStore {
    pool: SqlitePool,
    retention: RetentionPolicy,
}

impl EventStore {
    /// Create new EventStore
    pub fn new(pool: SqlitePool, retention: RetentionPolicy) -> Self {
        Self { pool, retention }
    }

    /// Create the schema if it does not exist
    ///
    /// Legacy databases may lack optional columns on old rows; they read
    /// back as None and are never treated as errors.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS detection_events (
                timestamp    TEXT PRIMARY KEY,
                class_label  TEXT NOT NULL,
                confidence   REAL NOT NULL,
                status       TEXT NOT NULL DEFAULT 'pending',
                image_path   TEXT,
                for_cleaning INTEGER,
                camera_id    TEXT,
                zone_name    TEXT,
                location     TEXT,
                latitude     REAL,
                longitude    REAL,
                cleaned_by   TEXT,
                cleaned_at   TEXT,
                notes        TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_detection_events_status ON detection_events(status)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Upsert an event by timestamp
    ///
    /// INSERT OR REPLACE: a duplicate timestamp silently overwrites the
    /// whole prior row. Retention runs after every successful write.
    pub async fn put(&self, event: &DetectionEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO detection_events (
                timestamp, class_label, confidence, status,
                image_path, for_cleaning,
                camera_id, zone_name, location, latitude, longitude,
                cleaned_by, cleaned_at, notes
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.timestamp)
        .bind(&event.class_label)
        .bind(event.confidence)
        .bind(event.status.as_str())
        .bind(&event.image_path)
        .bind(event.for_cleaning)
        .bind(&event.camera_id)
        .bind(&event.zone_name)
        .bind(&event.location)
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(&event.cleaned_by)
        .bind(&event.cleaned_at)
        .bind(&event.notes)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            timestamp = %event.timestamp,
            class = %event.class_label,
            confidence = event.confidence,
            "Detection event stored"
        );

        self.apply_retention().await?;

        Ok(())
    }

    /// All events, newest first
    pub async fn list(&self) -> Result<Vec<DetectionEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT
                timestamp, class_label, confidence, status,
                image_path, for_cleaning,
                camera_id, zone_name, location, latitude, longitude,
                cleaned_by, cleaned_at, notes
            FROM detection_events
            ORDER BY timestamp DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| self.row_to_event(row)).collect()
    }

    /// Single-row lookup by timestamp
    pub async fn get(&self, timestamp: &str) -> Result<Option<DetectionEvent>> {
        let row = sqlx::query(
            r#"
            SELECT
                timestamp, class_label, confidence, status,
                image_path, for_cleaning,
                camera_id, zone_name, location, latitude, longitude,
                cleaned_by, cleaned_at, notes
            FROM detection_events
            WHERE timestamp = ?
            "#,
        )
        .bind(timestamp)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.row_to_event(r)).transpose()
    }

    /// Update status by timestamp
    ///
    /// Returns whether a matching row existed; an absent key is reported
    /// as false, never as an error. Transition to cleaned stamps
    /// `cleaned_at` (idempotently re-stamped on repeat calls) and sets
    /// `cleaned_by`/`notes` when given, keeping prior values otherwise.
    /// The pending -> cleaned transition is one-way: a pending request on
    /// a cleaned row leaves the row unchanged.
    pub async fn update_status(
        &self,
        timestamp: &str,
        status: DetectionStatus,
        cleaned_by: Option<&str>,
        notes: Option<&str>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM detection_events WHERE timestamp = ?")
                .bind(timestamp)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(current) = current else {
            return Ok(false);
        };

        match status {
            DetectionStatus::Cleaned => {
                sqlx::query(
                    r#"
                    UPDATE detection_events
                    SET status = 'cleaned',
                        cleaned_at = ?,
                        cleaned_by = COALESCE(?, cleaned_by),
                        notes = COALESCE(?, notes)
                    WHERE timestamp = ?
                    "#,
                )
                .bind(now_timestamp())
                .bind(cleaned_by)
                .bind(notes)
                .bind(timestamp)
                .execute(&mut *tx)
                .await?;

                tracing::info!(
                    timestamp = %timestamp,
                    cleaned_by = cleaned_by.unwrap_or("-"),
                    "Detection marked cleaned"
                );
            }
            DetectionStatus::Pending => {
                if current == DetectionStatus::Cleaned.as_str() {
                    tracing::debug!(
                        timestamp = %timestamp,
                        "Ignoring reverse transition cleaned -> pending"
                    );
                }
                // Already pending: nothing to write
            }
        }

        tx.commit().await?;

        Ok(true)
    }

    /// Number of stored events
    pub async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM detection_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    /// Delete everything (dev/test seeding endpoints)
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM detection_events")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert `n` synthetic pending rows spaced 5 minutes apart
    ///
    /// Dev/test endpoint support; rows go through the normal put path.
    pub async fn seed_test_rows(&self, n: u32) -> Result<Vec<DetectionEvent>> {
        let now = Local::now();
        let mut seeded = Vec::with_capacity(n as usize);
        for i in 0..n as i64 {
            let stamp = (now - Duration::minutes(i * 5))
                .format(TIMESTAMP_FORMAT)
                .to_string();
            let event = DetectionEvent::synthetic(
                stamp,
                format!("test_garbage_{}", i + 1),
                0.95 - (i as f64 * 0.05),
                format!("Test Zone {}", i + 1),
                format!("Test Location {}", i + 1),
            );
            self.put(&event).await?;
            seeded.push(event);
        }
        Ok(seeded)
    }

    /// Enforce the retention policy, returning the number of deleted rows
    ///
    /// Count-based retention keeps the newest `max_count` rows; age-based
    /// retention drops rows whose key is older than the cutoff. Both are
    /// no-ops when unset.
    pub async fn apply_retention(&self) -> Result<u64> {
        let mut deleted = 0u64;

        if let Some(max_count) = self.retention.max_count {
            let result = sqlx::query(
                r#"
                DELETE FROM detection_events
                WHERE timestamp NOT IN (
                    SELECT timestamp FROM detection_events
                    ORDER BY timestamp DESC
                    LIMIT ?
                )
                "#,
            )
            .bind(max_count as i64)
            .execute(&self.pool)
            .await?;
            deleted += result.rows_affected();
        }

        if let Some(hours) = self.retention.max_age_hours {
            let cutoff = (Local::now() - Duration::hours(hours))
                .format(TIMESTAMP_FORMAT)
                .to_string();
            let result = sqlx::query("DELETE FROM detection_events WHERE timestamp < ?")
                .bind(&cutoff)
                .execute(&self.pool)
                .await?;
            deleted += result.rows_affected();
        }

        if deleted > 0 {
            tracing::info!(deleted = deleted, "Retention applied");
        }

        Ok(deleted)
    }

    fn row_to_event(&self, row: SqliteRow) -> Result<DetectionEvent> {
        let status_str: String = row.try_get("status")?;
        let status = match DetectionStatus::parse(&status_str) {
            Some(s) => s,
            None => {
                tracing::warn!(
                    status = %status_str,
                    "Unknown status value in store, treating as pending"
                );
                DetectionStatus::Pending
            }
        };

        Ok(DetectionEvent {
            timestamp: row.try_get("timestamp")?,
            class_label: row.try_get("class_label")?,
            confidence: row.try_get("confidence")?,
            status,
            image_path: row.try_get("image_path")?,
            for_cleaning: row.try_get("for_cleaning")?,
            camera_id: row.try_get("camera_id")?,
            zone_name: row.try_get("zone_name")?,
            location: row.try_get("location")?,
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            cleaned_by: row.try_get("cleaned_by")?,
            cleaned_at: row.try_get("cleaned_at")?,
            notes: row.try_get("notes")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool")
    }

    async fn memory_store(retention: RetentionPolicy) -> EventStore {
        let store = EventStore::new(memory_pool().await, retention);
        store.init().await.expect("schema");
        store
    }

    fn sample_event(timestamp: &str, class_label: &str, confidence: f64) -> DetectionEvent {
        DetectionEvent {
            timestamp: timestamp.to_string(),
            class_label: class_label.to_string(),
            confidence,
            status: DetectionStatus::Pending,
            image_path: Some(format!(
                "uploads/detection_{}.jpg",
                timestamp.replace(' ', "_").replace(':', "-")
            )),
            for_cleaning: Some(true),
            camera_id: Some("camera_0".to_string()),
            zone_name: Some("Zone 1".to_string()),
            location: Some("Main Entrance".to_string()),
            latitude: None,
            longitude: None,
            cleaned_by: None,
            cleaned_at: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = memory_store(RetentionPolicy::unbounded()).await;

        store
            .put(&sample_event("2024-01-01 10:00:00", "garbage", 0.95))
            .await
            .unwrap();
        store
            .put(&sample_event("2024-01-01 10:00:30", "trash", 0.92))
            .await
            .unwrap();

        let events = store.list().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, "2024-01-01 10:00:30");
        assert_eq!(events[0].class_label, "trash");
        assert_eq!(events[1].timestamp, "2024-01-01 10:00:00");
        assert_eq!(events[1].class_label, "garbage");
    }

    #[tokio::test]
    async fn test_put_replaces_duplicate_timestamp() {
        let store = memory_store(RetentionPolicy::unbounded()).await;

        store
            .put(&sample_event("2024-01-01 10:00:00", "garbage", 0.95))
            .await
            .unwrap();

        let mut replacement = sample_event("2024-01-01 10:00:00", "trash", 0.55);
        replacement.zone_name = Some("Zone 9".to_string());
        store.put(&replacement).await.unwrap();

        let events = store.list().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].class_label, "trash");
        assert_eq!(events[0].confidence, 0.55);
        assert_eq!(events[0].zone_name.as_deref(), Some("Zone 9"));
    }

    #[tokio::test]
    async fn test_update_status_missing_key_returns_false() {
        let store = memory_store(RetentionPolicy::unbounded()).await;

        let matched = store
            .update_status("2099-01-01 00:00:00", DetectionStatus::Cleaned, None, None)
            .await
            .unwrap();
        assert!(!matched);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_status_cleaned_stamps_audit_fields() {
        let store = memory_store(RetentionPolicy::unbounded()).await;
        store
            .put(&sample_event("2024-01-01 10:00:00", "garbage", 0.95))
            .await
            .unwrap();

        let matched = store
            .update_status(
                "2024-01-01 10:00:00",
                DetectionStatus::Cleaned,
                Some("crew-7"),
                Some("bagged and removed"),
            )
            .await
            .unwrap();
        assert!(matched);

        let event = store.get("2024-01-01 10:00:00").await.unwrap().unwrap();
        assert_eq!(event.status, DetectionStatus::Cleaned);
        assert_eq!(event.cleaned_by.as_deref(), Some("crew-7"));
        assert_eq!(event.notes.as_deref(), Some("bagged and removed"));
        assert!(event.cleaned_at.is_some());
    }

    #[tokio::test]
    async fn test_reclean_is_idempotent() {
        let store = memory_store(RetentionPolicy::unbounded()).await;
        store
            .put(&sample_event("2024-01-01 10:00:00", "garbage", 0.95))
            .await
            .unwrap();

        store
            .update_status(
                "2024-01-01 10:00:00",
                DetectionStatus::Cleaned,
                Some("crew-7"),
                Some("first pass"),
            )
            .await
            .unwrap();
        let first = store.get("2024-01-01 10:00:00").await.unwrap().unwrap();

        let matched = store
            .update_status("2024-01-01 10:00:00", DetectionStatus::Cleaned, None, None)
            .await
            .unwrap();
        assert!(matched);
        let second = store.get("2024-01-01 10:00:00").await.unwrap().unwrap();

        // Second call refreshes cleaned_at only; everything else is stable.
        assert!(second.cleaned_at.is_some());
        let normalized = DetectionEvent {
            cleaned_at: first.cleaned_at.clone(),
            ..second.clone()
        };
        assert_eq!(normalized, first);
        assert_eq!(second.cleaned_by.as_deref(), Some("crew-7"));
        assert_eq!(second.notes.as_deref(), Some("first pass"));
    }

    #[tokio::test]
    async fn test_reverse_transition_leaves_row_cleaned() {
        let store = memory_store(RetentionPolicy::unbounded()).await;
        store
            .put(&sample_event("2024-01-01 10:00:00", "garbage", 0.95))
            .await
            .unwrap();
        store
            .update_status(
                "2024-01-01 10:00:00",
                DetectionStatus::Cleaned,
                Some("crew-7"),
                None,
            )
            .await
            .unwrap();

        let matched = store
            .update_status("2024-01-01 10:00:00", DetectionStatus::Pending, None, None)
            .await
            .unwrap();
        assert!(matched);

        let event = store.get("2024-01-01 10:00:00").await.unwrap().unwrap();
        assert_eq!(event.status, DetectionStatus::Cleaned);
        assert_eq!(event.cleaned_by.as_deref(), Some("crew-7"));
    }

    #[tokio::test]
    async fn test_retention_keeps_newest_rows() {
        let retention = RetentionPolicy {
            max_count: Some(3),
            max_age_hours: None,
        };
        let store = memory_store(retention).await;

        for i in 0..5 {
            store
                .put(&sample_event(
                    &format!("2024-01-01 10:00:0{}", i),
                    "garbage",
                    0.9,
                ))
                .await
                .unwrap();
        }

        let events = store.list().await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].timestamp, "2024-01-01 10:00:04");
        assert_eq!(events[2].timestamp, "2024-01-01 10:00:02");
    }

    #[tokio::test]
    async fn test_legacy_row_missing_columns_reads_as_unset() {
        let store = memory_store(RetentionPolicy::unbounded()).await;

        // Row written by an old deployment: only the original columns.
        sqlx::query(
            r#"
            INSERT INTO detection_events (timestamp, class_label, confidence, status)
            VALUES ('2023-06-01 09:00:00', 'garbage', 0.77, 'pending')
            "#,
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let event = store.get("2023-06-01 09:00:00").await.unwrap().unwrap();
        assert_eq!(event.for_cleaning, None);
        assert_eq!(event.camera_id, None);
        assert_eq!(event.zone_name, None);
        assert_eq!(event.location, None);
        assert_eq!(event.image_path, None);
        assert_eq!(event.status, DetectionStatus::Pending);
    }

    #[tokio::test]
    async fn test_count_and_clear() {
        let store = memory_store(RetentionPolicy::unbounded()).await;
        store
            .put(&sample_event("2024-01-01 10:00:00", "garbage", 0.95))
            .await
            .unwrap();
        store
            .put(&sample_event("2024-01-01 10:00:30", "trash", 0.92))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_seed_test_rows_descending_confidence() {
        let store = memory_store(RetentionPolicy::unbounded()).await;

        let seeded = store.seed_test_rows(5).await.unwrap();
        assert_eq!(seeded.len(), 5);
        assert_eq!(store.count().await.unwrap(), 5);

        assert_eq!(seeded[0].class_label, "test_garbage_1");
        assert_eq!(seeded[0].confidence, 0.95);
        assert_eq!(seeded[4].class_label, "test_garbage_5");
        assert!((seeded[4].confidence - 0.75).abs() < 1e-9);
        assert!(seeded.iter().all(|e| e.status == DetectionStatus::Pending));
        assert!(seeded.iter().all(|e| e.for_cleaning == Some(true)));
    }
}
