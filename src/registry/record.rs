//! Persisted model record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::ModelStatus;
use crate::eval::EvalReport;
use crate::monitor::{DriftReport, FeatureBaseline};
use crate::train::TrainedModel;

/// A trained model plus its lifecycle bookkeeping. Owned exclusively by the
/// registry; lives until explicitly retired or deleted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Unique id, never reused
    pub id: String,
    /// Sortable version token, `vYYYYMMDD-NNN`; never mutated after creation
    pub version: String,
    pub status: ModelStatus,
    pub model: TrainedModel,
    /// Validation metrics from the run that produced the model
    pub metrics: EvalReport,
    /// Training-time feature distribution for drift comparison
    pub baseline: Option<FeatureBaseline>,
    pub created_at: DateTime<Utc>,
    pub deployed_at: Option<DateTime<Utc>>,
    pub retired_at: Option<DateTime<Utc>>,
    /// Inference calls served by this record
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    /// Latest drift report; overwritten, not appended
    pub drift: Option<DriftReport>,
}

/// Outcome of a successful deployment request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deployment {
    pub model_id: String,
    pub version: String,
    pub deployed_at: DateTime<Utc>,
}
