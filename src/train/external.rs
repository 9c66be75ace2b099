//! Delegated training through an external service
//!
//! The transport is pluggable behind [`TrainerBackend`]; this module owns the
//! request/response contract and the failure policy. A backend call is
//! bounded by the configured timeout and any transport failure, timeout, or
//! malformed response fails the training attempt outright. There is no
//! silent fallback to an empty model and no retry here; retry/backoff policy
//! belongs to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use super::{Hyperparameters, ModelParams, Result, TrainedModel};
use crate::data::Dataset;

/// Serialized payload sent to the training service. Both subsets travel so
/// the backend can fit on the training rows and tune or early-stop against
/// the held-out validation rows.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainRequest {
    pub algorithm: String,
    pub schema: Vec<String>,
    /// Dense training feature rows in schema order
    pub rows: Vec<Vec<f64>>,
    /// One 0/1 label per training row
    pub labels: Vec<u8>,
    /// Held-out validation rows in schema order
    pub validation_rows: Vec<Vec<f64>>,
    /// One 0/1 label per validation row
    pub validation_labels: Vec<u8>,
    pub hyperparameters: Hyperparameters,
    /// Bound the backend must respect, in seconds
    pub timeout_secs: u64,
}

/// Payload returned by the training service. The linear scoring head makes
/// the model locally servable; `raw` carries whatever else the backend
/// produced, kept opaquely for export.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub weights: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub importance: BTreeMap<String, f64>,
    #[serde(default)]
    pub raw: Option<serde_json::Value>,
}

/// External-call failures; all fatal to the training attempt
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("call exceeded {0}s timeout")]
    Timeout(u64),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("bad response: {0}")]
    BadResponse(String),
}

/// Transport for a remote training service.
///
/// Implementations own connection handling and must give up within
/// `request.timeout_secs`, returning [`BackendError::Timeout`].
pub trait TrainerBackend: Send + Sync {
    fn train(&self, request: &TrainRequest) -> std::result::Result<TrainResponse, BackendError>;
}

/// Trainer that serializes the training set and delegates the fit
pub struct ExternalTrainer {
    backend: Box<dyn TrainerBackend>,
    algorithm: String,
    timeout: Duration,
}

impl ExternalTrainer {
    pub fn new(backend: Box<dyn TrainerBackend>, algorithm: impl Into<String>, timeout: Duration) -> Self {
        Self {
            backend,
            algorithm: algorithm.into(),
            timeout,
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn train(
        &self,
        train_set: &Dataset,
        validation_set: &Dataset,
        options: &Hyperparameters,
    ) -> Result<TrainedModel> {
        if train_set.is_empty() {
            return Err(super::TrainingError::EmptyTrainingSet);
        }

        let request = TrainRequest {
            algorithm: self.algorithm.clone(),
            schema: train_set.schema().to_vec(),
            rows: train_set.rows(),
            labels: labels_of(train_set),
            validation_rows: validation_set.rows(),
            validation_labels: labels_of(validation_set),
            hyperparameters: options.clone(),
            timeout_secs: self.timeout.as_secs(),
        };

        let response = self.backend.train(&request).map_err(|err| {
            error!(algorithm = %self.algorithm, error = %err, "external training failed");
            err
        })?;

        if response.weights.len() != train_set.schema().len() {
            return Err(BackendError::BadResponse(format!(
                "expected {} weights, got {}",
                train_set.schema().len(),
                response.weights.len()
            ))
            .into());
        }

        Ok(TrainedModel {
            algorithm: self.algorithm.clone(),
            params: ModelParams {
                weights: response.weights,
                intercept: response.intercept,
                raw: response.raw,
            },
            importance: response.importance,
            options: options.clone(),
            schema: train_set.schema().to_vec(),
        })
    }
}

fn labels_of(dataset: &Dataset) -> Vec<u8> {
    dataset
        .examples()
        .iter()
        .map(|ex| u8::from(ex.label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetMetadata, FeatureVector, LabeledExample};
    use crate::train::TrainingError;

    struct FixedBackend {
        response: std::result::Result<TrainResponse, &'static str>,
    }

    impl TrainerBackend for FixedBackend {
        fn train(&self, _request: &TrainRequest) -> std::result::Result<TrainResponse, BackendError> {
            match &self.response {
                Ok(r) => Ok(r.clone()),
                Err(msg) => Err(BackendError::Transport((*msg).to_string())),
            }
        }
    }

    struct TimeoutBackend;

    impl TrainerBackend for TimeoutBackend {
        fn train(&self, request: &TrainRequest) -> std::result::Result<TrainResponse, BackendError> {
            Err(BackendError::Timeout(request.timeout_secs))
        }
    }

    fn dataset_of(n: usize) -> Dataset {
        let examples: Vec<LabeledExample> = (0..n)
            .map(|i| {
                let mut features = FeatureVector::new();
                features.insert("x".to_string(), i as f64);
                LabeledExample {
                    features,
                    label: i >= n / 2,
                }
            })
            .collect();
        Dataset::new(
            vec!["x".to_string()],
            examples,
            DatasetMetadata::new(n, n),
        )
    }

    fn dataset() -> Dataset {
        dataset_of(4)
    }

    #[test]
    fn test_delegated_fit_returns_servable_model() {
        let backend = FixedBackend {
            response: Ok(TrainResponse {
                weights: vec![1.5],
                intercept: -0.5,
                importance: BTreeMap::from([("x".to_string(), 1.0)]),
                raw: Some(serde_json::json!({"trees": 100})),
            }),
        };
        let trainer = ExternalTrainer::new(
            Box::new(backend),
            "gradient_boosting",
            Duration::from_secs(300),
        );
        let model = trainer.train(&dataset(), &dataset_of(2), &Hyperparameters::default()).unwrap();
        assert_eq!(model.algorithm, "gradient_boosting");
        assert_eq!(model.params.weights, vec![1.5]);
        assert!(model.params.raw.is_some());
        // z = 1.5*2 - 0.5 = 2.5
        let p = model.predict_row(&[2.0]).unwrap();
        assert!(p > 0.9);
    }

    #[test]
    fn test_request_carries_both_subsets() {
        use std::sync::Mutex;

        struct CapturingBackend {
            seen: Mutex<Option<TrainRequest>>,
        }

        impl TrainerBackend for CapturingBackend {
            fn train(
                &self,
                request: &TrainRequest,
            ) -> std::result::Result<TrainResponse, BackendError> {
                *self.seen.lock().unwrap() = Some(request.clone());
                Ok(TrainResponse {
                    weights: vec![1.0],
                    intercept: 0.0,
                    importance: BTreeMap::new(),
                    raw: None,
                })
            }
        }

        let backend = std::sync::Arc::new(CapturingBackend {
            seen: Mutex::new(None),
        });

        struct Forward(std::sync::Arc<CapturingBackend>);
        impl TrainerBackend for Forward {
            fn train(
                &self,
                request: &TrainRequest,
            ) -> std::result::Result<TrainResponse, BackendError> {
                self.0.train(request)
            }
        }

        let trainer = ExternalTrainer::new(
            Box::new(Forward(std::sync::Arc::clone(&backend))),
            "gradient_boosting",
            Duration::from_secs(300),
        );
        trainer
            .train(&dataset_of(6), &dataset_of(3), &Hyperparameters::default())
            .unwrap();

        let request = backend.seen.lock().unwrap().take().unwrap();
        assert_eq!(request.rows.len(), 6);
        assert_eq!(request.labels.len(), 6);
        assert_eq!(request.validation_rows.len(), 3);
        assert_eq!(request.validation_labels.len(), 3);
        assert_eq!(request.schema, vec!["x".to_string()]);
    }

    #[test]
    fn test_transport_failure_is_fatal() {
        let trainer = ExternalTrainer::new(
            Box::new(FixedBackend {
                response: Err("connection refused"),
            }),
            "gradient_boosting",
            Duration::from_secs(300),
        );
        let result = trainer.train(&dataset(), &dataset_of(2), &Hyperparameters::default());
        assert!(matches!(
            result,
            Err(TrainingError::Backend(BackendError::Transport(_)))
        ));
    }

    #[test]
    fn test_timeout_carries_bound() {
        let trainer = ExternalTrainer::new(
            Box::new(TimeoutBackend),
            "gradient_boosting",
            Duration::from_secs(300),
        );
        let result = trainer.train(&dataset(), &dataset_of(2), &Hyperparameters::default());
        assert!(matches!(
            result,
            Err(TrainingError::Backend(BackendError::Timeout(300)))
        ));
    }

    #[test]
    fn test_weight_count_mismatch_rejected() {
        let backend = FixedBackend {
            response: Ok(TrainResponse {
                weights: vec![1.0, 2.0], // schema has one feature
                intercept: 0.0,
                importance: BTreeMap::new(),
                raw: None,
            }),
        };
        let trainer = ExternalTrainer::new(
            Box::new(backend),
            "gradient_boosting",
            Duration::from_secs(300),
        );
        let result = trainer.train(&dataset(), &dataset_of(2), &Hyperparameters::default());
        assert!(matches!(
            result,
            Err(TrainingError::Backend(BackendError::BadResponse(_)))
        ));
    }
}
