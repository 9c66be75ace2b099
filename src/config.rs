//! Pipeline configuration
//!
//! Every tunable lives here as a named field with an explicit default.
//! Algorithm code never reads the environment; callers construct a config
//! once and pass it down.

use serde::{Deserialize, Serialize};

use crate::train::Hyperparameters;

/// Drift classification thresholds, ordered critical > warning > monitoring
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DriftThresholds {
    /// Above this the model needs immediate retraining
    pub critical: f64,
    /// Above this retraining should be scheduled
    pub warning: f64,
    /// Above this the model should be watched closely
    pub monitoring: f64,
}

impl Default for DriftThresholds {
    fn default() -> Self {
        Self {
            critical: 0.10,
            warning: 0.05,
            monitoring: 0.02,
        }
    }
}

/// Configuration for the full training pipeline
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Minimum validation accuracy for a run to persist a deployable model
    pub performance_threshold: f64,
    /// Fraction of the cleaned dataset held out for validation, in (0, 1)
    pub validation_fraction: f64,
    /// Minimum cleaned examples required before training is attempted
    pub min_samples: usize,
    /// Seed for the split shuffle; `None` draws from entropy
    pub split_seed: Option<u64>,
    /// External training service endpoint; when set, training delegates
    /// to the configured backend instead of the local optimizer
    pub external_endpoint: Option<String>,
    /// Bounded timeout for external trainer calls, in seconds
    pub external_timeout_secs: u64,
    /// Drift classification thresholds
    pub drift: DriftThresholds,
    /// Default optimizer hyperparameters
    pub hyperparameters: Hyperparameters,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            performance_threshold: 0.85,
            validation_fraction: 0.2,
            min_samples: 50,
            split_seed: None,
            external_endpoint: None,
            external_timeout_secs: 300,
            drift: DriftThresholds::default(),
            hyperparameters: Hyperparameters::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the accuracy threshold below which a run is reported as failed
    pub fn with_performance_threshold(mut self, threshold: f64) -> Self {
        self.performance_threshold = threshold;
        self
    }

    /// Set the validation hold-out fraction
    pub fn with_validation_fraction(mut self, fraction: f64) -> Self {
        self.validation_fraction = fraction;
        self
    }

    /// Set the minimum cleaned-sample requirement
    pub fn with_min_samples(mut self, min: usize) -> Self {
        self.min_samples = min;
        self
    }

    /// Fix the split shuffle seed for reproducible runs
    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = Some(seed);
        self
    }

    /// Route training through an external service at the given endpoint
    pub fn with_external_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.external_endpoint = Some(endpoint.into());
        self
    }

    /// Set drift classification thresholds
    pub fn with_drift_thresholds(mut self, thresholds: DriftThresholds) -> Self {
        self.drift = thresholds;
        self
    }

    /// Set default optimizer hyperparameters
    pub fn with_hyperparameters(mut self, hp: Hyperparameters) -> Self {
        self.hyperparameters = hp;
        self
    }
}
