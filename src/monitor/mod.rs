//! Drift monitoring for the deployed model
//!
//! Compares the distribution of recent live feature vectors against the
//! training-time baseline stored with the deployed record, aggregates the
//! per-feature Population Stability Index into one score, classifies it
//! against configured thresholds, and recommends (or alerts for) retraining.

mod baseline;
mod drift;

pub use baseline::FeatureBaseline;
pub use drift::{AlertCallback, DriftMonitor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Drift classification for one check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    /// Score at or below the monitoring threshold
    Stable,
    /// Score above the monitoring threshold
    Monitoring,
    /// Score above the warning threshold
    Warning,
    /// Score above the critical threshold; retrain now
    Critical,
    /// Nothing is deployed; deploy before monitoring
    NoActiveModel,
    /// Baseline or live window missing; drift cannot be assessed
    CannotAssess,
}

impl DriftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DriftStatus::Stable => "stable",
            DriftStatus::Monitoring => "monitoring",
            DriftStatus::Warning => "warning",
            DriftStatus::Critical => "critical",
            DriftStatus::NoActiveModel => "no_active_model",
            DriftStatus::CannotAssess => "cannot_assess",
        }
    }

    /// Action recommended to the collaborator for this classification
    pub fn recommendation(self) -> &'static str {
        match self {
            DriftStatus::Stable => "continue_monitoring",
            DriftStatus::Monitoring => "monitor_closely",
            DriftStatus::Warning => "schedule_retraining",
            DriftStatus::Critical => "immediate_retraining",
            DriftStatus::NoActiveModel => "deploy_model",
            DriftStatus::CannotAssess => "collect_baseline",
        }
    }
}

impl std::fmt::Display for DriftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one drift check. Immutable; the registry keeps only the latest
/// report per model (overwrite, not append).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriftReport {
    /// Checked model, when one was deployed
    pub model_id: Option<String>,
    /// Aggregated non-negative drift score (mean per-feature PSI)
    pub score: f64,
    pub status: DriftStatus,
    pub recommendation: String,
    pub checked_at: DateTime<Utc>,
}

impl DriftReport {
    pub(crate) fn new(model_id: Option<String>, score: f64, status: DriftStatus) -> Self {
        Self {
            model_id,
            score,
            status,
            recommendation: status.recommendation().to_string(),
            checked_at: Utc::now(),
        }
    }
}
