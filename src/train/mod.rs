//! Model training
//!
//! One contract, two interchangeable strategies: a local gradient-descent
//! logistic regression, or delegation to a pluggable external training
//! backend. The strategy is selected once from configuration, not re-checked
//! per call.

mod external;
mod logistic;

pub use external::{BackendError, ExternalTrainer, TrainRequest, TrainResponse, TrainerBackend};
pub use logistic::LogisticTrainer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Dataset;

/// Optimizer and algorithm tunables
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub learning_rate: f64,
    pub max_iterations: usize,
    /// Early-stop bound on the max absolute gradient
    pub tolerance: f64,
    /// Tree-based algorithms only; ignored by logistic regression
    pub max_depth: Option<u32>,
    /// Ensemble algorithms only; ignored by logistic regression
    pub n_estimators: Option<u32>,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            max_iterations: 1000,
            tolerance: 1e-6,
            max_depth: None,
            n_estimators: None,
        }
    }
}

/// Fitted model parameters: a linear scoring head plus any opaque payload an
/// external backend returned alongside it. Outside the trainer and evaluator,
/// treat this as a blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelParams {
    /// One weight per schema feature, in schema order
    pub weights: Vec<f64>,
    pub intercept: f64,
    /// Backend-specific payload, kept for export; never interpreted here
    pub raw: Option<serde_json::Value>,
}

/// A fitted model: algorithm id, parameters, importances, and the options
/// and schema the fit used. Immutable once produced; safe to score from many
/// threads concurrently.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub algorithm: String,
    pub params: ModelParams,
    /// Feature -> |weight| normalized so the dominant feature is 1.0
    pub importance: BTreeMap<String, f64>,
    pub options: Hyperparameters,
    /// Feature names the parameters are ordered by
    pub schema: Vec<String>,
}

impl TrainedModel {
    /// Probability of repayment for one dense feature row in schema order
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.params.weights.len() {
            return Err(TrainingError::SchemaMismatch {
                expected: self.params.weights.len(),
                got: row.len(),
            });
        }
        let z: f64 = self.params.intercept
            + self
                .params
                .weights
                .iter()
                .zip(row.iter())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        Ok(sigmoid(z))
    }
}

/// Logistic link
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Training-stage errors. Optimizer non-convergence is not among them: the
/// local trainer stops early with best-so-far weights instead.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("model expects {expected} features, got {got}")]
    SchemaMismatch { expected: usize, got: usize },

    #[error("external trainer failed: {0}")]
    Backend(#[from] BackendError),

    #[error("external endpoint configured but no backend supplied")]
    BackendMissing,
}

/// Result alias for training operations
pub type Result<T> = std::result::Result<T, TrainingError>;

/// Closed dispatch over the two training strategies
pub enum Trainer {
    Local(LogisticTrainer),
    External(ExternalTrainer),
}

impl Trainer {
    /// A local gradient-descent trainer
    pub fn local() -> Self {
        Trainer::Local(LogisticTrainer::new())
    }

    /// A trainer delegating to an external service
    pub fn external(trainer: ExternalTrainer) -> Self {
        Trainer::External(trainer)
    }

    /// Fit a model on the training subset.
    ///
    /// The validation subset rides along so a delegated backend can tune
    /// against it; the local trainer fits on the training rows alone.
    pub fn train(
        &self,
        train_set: &Dataset,
        validation_set: &Dataset,
        options: &Hyperparameters,
    ) -> Result<TrainedModel> {
        match self {
            Trainer::Local(t) => t.train(train_set, options),
            Trainer::External(t) => t.train(train_set, validation_set, options),
        }
    }

    pub fn algorithm(&self) -> &str {
        match self {
            Trainer::Local(_) => "logistic_regression",
            Trainer::External(t) => t.algorithm(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_bounds() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(40.0) > 0.999);
        assert!(sigmoid(-40.0) < 0.001);
    }

    #[test]
    fn test_predict_row_schema_mismatch() {
        let model = TrainedModel {
            algorithm: "logistic_regression".to_string(),
            params: ModelParams {
                weights: vec![1.0, -1.0],
                intercept: 0.0,
                raw: None,
            },
            importance: BTreeMap::new(),
            options: Hyperparameters::default(),
            schema: vec!["a".to_string(), "b".to_string()],
        };
        assert!(matches!(
            model.predict_row(&[1.0]),
            Err(TrainingError::SchemaMismatch { expected: 2, got: 1 })
        ));
        let p = model.predict_row(&[2.0, 2.0]).unwrap();
        assert!((p - 0.5).abs() < 1e-12);
    }
}
