//! Model lifecycle status

use serde::{Deserialize, Serialize};

/// Lifecycle states: training -> trained -> deployed -> retired.
///
/// A deployed model may be archived straight to `Retired` without any
/// intermediate state; retired records stay readable for audit but are
/// never selected for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// A training run is in flight
    Training,
    /// Fitted and evaluated, eligible for deployment
    Trained,
    /// Serving live predictions (at most one record system-wide)
    Deployed,
    /// Terminal; audit-readable only
    Retired,
}

impl ModelStatus {
    /// Whether moving to `target` is a legal lifecycle transition
    pub fn can_transition_to(self, target: ModelStatus) -> bool {
        matches!(
            (self, target),
            (ModelStatus::Training, ModelStatus::Trained)
                | (ModelStatus::Trained, ModelStatus::Deployed)
                | (ModelStatus::Trained, ModelStatus::Retired)
                | (ModelStatus::Deployed, ModelStatus::Retired)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelStatus::Training => "training",
            ModelStatus::Trained => "trained",
            ModelStatus::Deployed => "deployed",
            ModelStatus::Retired => "retired",
        }
    }
}

impl std::fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
