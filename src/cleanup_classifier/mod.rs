//! CleanupClassifier - "flag for cleanup" decision
//!
//! ## Responsibilities
//!
//! - Decide `for_cleaning` once per new detection
//! - Rate-limit flagged events to one per cooldown window
//! - Global or per-camera cooldown keying

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Cooldown keying
///
/// The single-camera deployment uses one shared timer; multi-camera sites
/// can key the cooldown by camera instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownScope {
    #[default]
    Global,
    PerCamera,
}

impl CooldownScope {
    /// Parse from config text
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(CooldownScope::Global),
            "per_camera" => Some(CooldownScope::PerCamera),
            _ => None,
        }
    }
}

/// Cleanup cadence policy
#[derive(Debug, Clone, Copy)]
pub struct CleanupPolicy {
    /// Minimum time between two flagged detections
    pub cooldown: Duration,
    pub scope: CooldownScope,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(60),
            scope: CooldownScope::Global,
        }
    }
}

#[derive(Debug, Default)]
struct ClassifierState {
    last_marked_global: Option<DateTime<Utc>>,
    last_marked_by_camera: HashMap<String, DateTime<Utc>>,
}

/// CleanupClassifier instance
pub struct CleanupClassifier {
    policy: CleanupPolicy,
    state: RwLock<ClassifierState>,
}

impl CleanupClassifier {
    /// Create new CleanupClassifier
    pub fn new(policy: CleanupPolicy) -> Self {
        Self {
            policy,
            state: RwLock::new(ClassifierState::default()),
        }
    }

    /// Decide `for_cleaning` for a detection happening now
    pub async fn decide(&self, camera_id: &str) -> bool {
        self.decide_at(camera_id, Utc::now()).await
    }

    /// Decide `for_cleaning` for a detection at `now`
    ///
    /// True when the cooldown window since the last flagged detection has
    /// elapsed (a never-marked key counts as elapsed); flagging moves the
    /// window. The decision and the window move happen under one write
    /// lock so concurrent detections cannot both claim the same window.
    /// A claim whose detection then fails to persist can be handed back
    /// with [`reopen`](Self::reopen).
    pub async fn decide_at(&self, camera_id: &str, now: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;

        let last_marked = match self.policy.scope {
            CooldownScope::Global => state.last_marked_global,
            CooldownScope::PerCamera => state.last_marked_by_camera.get(camera_id).copied(),
        };

        let flag = match last_marked {
            None => true,
            Some(last) => now - last >= self.policy.cooldown,
        };

        if flag {
            match self.policy.scope {
                CooldownScope::Global => state.last_marked_global = Some(now),
                CooldownScope::PerCamera => {
                    state
                        .last_marked_by_camera
                        .insert(camera_id.to_string(), now);
                }
            }
            tracing::debug!(camera_id = %camera_id, "Detection flagged for cleanup");
        }

        flag
    }

    /// Hand back a window claimed at `claimed_at`
    ///
    /// Used when the flagged detection could not be persisted, so the
    /// flag is not lost for the rest of the cooldown window. A claim
    /// that has since been superseded is left untouched.
    pub async fn reopen(&self, camera_id: &str, claimed_at: DateTime<Utc>) {
        let mut state = self.state.write().await;

        let reopened = match self.policy.scope {
            CooldownScope::Global => {
                if state.last_marked_global == Some(claimed_at) {
                    state.last_marked_global = None;
                    true
                } else {
                    false
                }
            }
            CooldownScope::PerCamera => {
                if state.last_marked_by_camera.get(camera_id) == Some(&claimed_at) {
                    state.last_marked_by_camera.remove(camera_id);
                    true
                } else {
                    false
                }
            }
        };

        if reopened {
            tracing::debug!(camera_id = %camera_id, "Cooldown window reopened");
        }
    }

    /// Current policy
    pub fn policy(&self) -> CleanupPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn test_cadence_sequence() {
        let classifier = CleanupClassifier::new(CleanupPolicy::default());
        let base = t0();

        assert!(classifier.decide_at("camera_0", base).await);
        assert!(
            !classifier
                .decide_at("camera_0", base + Duration::seconds(30))
                .await
        );
        assert!(
            classifier
                .decide_at("camera_0", base + Duration::seconds(61))
                .await
        );
    }

    #[tokio::test]
    async fn test_exact_cooldown_boundary_flags() {
        let classifier = CleanupClassifier::new(CleanupPolicy::default());
        let base = t0();

        assert!(classifier.decide_at("camera_0", base).await);
        assert!(
            classifier
                .decide_at("camera_0", base + Duration::seconds(60))
                .await
        );
    }

    #[tokio::test]
    async fn test_global_scope_shares_window_across_cameras() {
        let classifier = CleanupClassifier::new(CleanupPolicy::default());
        let base = t0();

        assert!(classifier.decide_at("camera_0", base).await);
        assert!(
            !classifier
                .decide_at("camera_1", base + Duration::seconds(10))
                .await
        );
    }

    #[tokio::test]
    async fn test_per_camera_scope_keys_windows_independently() {
        let policy = CleanupPolicy {
            scope: CooldownScope::PerCamera,
            ..CleanupPolicy::default()
        };
        let classifier = CleanupClassifier::new(policy);
        let base = t0();

        assert!(classifier.decide_at("camera_0", base).await);
        assert!(
            classifier
                .decide_at("camera_1", base + Duration::seconds(10))
                .await
        );
        assert!(
            !classifier
                .decide_at("camera_0", base + Duration::seconds(10))
                .await
        );
    }

    #[tokio::test]
    async fn test_reopen_hands_claimed_window_back() {
        let classifier = CleanupClassifier::new(CleanupPolicy::default());
        let base = t0();

        assert!(classifier.decide_at("camera_0", base).await);
        classifier.reopen("camera_0", base).await;
        assert!(
            classifier
                .decide_at("camera_0", base + Duration::seconds(1))
                .await
        );
    }

    #[tokio::test]
    async fn test_reopen_leaves_superseded_claim_alone() {
        let classifier = CleanupClassifier::new(CleanupPolicy::default());
        let base = t0();

        assert!(classifier.decide_at("camera_0", base).await);
        classifier
            .reopen("camera_0", base + Duration::seconds(5))
            .await;
        assert!(
            !classifier
                .decide_at("camera_0", base + Duration::seconds(30))
                .await
        );
    }

    #[tokio::test]
    async fn test_reopen_per_camera_scope_keys_by_camera() {
        let policy = CleanupPolicy {
            scope: CooldownScope::PerCamera,
            ..CleanupPolicy::default()
        };
        let classifier = CleanupClassifier::new(policy);
        let base = t0();

        assert!(classifier.decide_at("camera_0", base).await);
        assert!(classifier.decide_at("camera_1", base).await);

        classifier.reopen("camera_0", base).await;
        assert!(
            classifier
                .decide_at("camera_0", base + Duration::seconds(1))
                .await
        );
        assert!(
            !classifier
                .decide_at("camera_1", base + Duration::seconds(1))
                .await
        );
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(CooldownScope::parse("global"), Some(CooldownScope::Global));
        assert_eq!(
            CooldownScope::parse("per_camera"),
            Some(CooldownScope::PerCamera)
        );
        assert_eq!(CooldownScope::parse("per-zone"), None);
    }

    #[test]
    fn test_default_policy() {
        let policy = CleanupPolicy::default();
        assert_eq!(policy.cooldown, Duration::seconds(60));
        assert_eq!(policy.scope, CooldownScope::Global);
    }
}
