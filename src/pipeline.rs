//! Training pipeline orchestration
//!
//! Wires the stages end to end: fetch raw records from the collaborator,
//! extract, clean, split, fit, evaluate, and persist into the registry.
//! Training is a heavy batch job; `train_new_model_background` runs it on a
//! worker thread so no request-handling thread ever trains inline.
//!
//! Two failure shapes are deliberate outcomes, not errors: too little clean
//! data and a model below the performance threshold both come back as a
//! structured [`TrainingOutcome::Failed`] with metrics and improvement
//! recommendations. Hard faults (a dead external backend, an empty split)
//! surface as [`crate::Error`].

use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::data::{split, DataError, Preparer};
use crate::error::Result;
use crate::eval::{evaluate, EvalReport};
use crate::features::{CustomerRecord, FeatureExtractor, LoanRecord};
use crate::monitor::FeatureBaseline;
use crate::registry::{Deployment, ModelRegistry};
use crate::train::{ExternalTrainer, Hyperparameters, Trainer, TrainerBackend, TrainingError};

/// Extraction date window; `None` bounds are open
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ExtractionWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ExtractionWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Supplies raw (loan, customer) pairs from the surrounding system.
///
/// Implementations may over-fetch; the pipeline applies the window filter
/// and sample cap itself.
pub trait RecordSource: Send + Sync {
    fn fetch(
        &self,
        window: &ExtractionWindow,
    ) -> std::result::Result<Vec<(LoanRecord, CustomerRecord)>, DataError>;
}

/// Options for one training request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainRunOptions {
    /// Advisory algorithm label recorded with the run; the trainer strategy
    /// itself is fixed by configuration, not per call
    pub algorithm: String,
    /// Cap on extracted rows
    pub max_samples: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Overrides the configured defaults when set
    pub hyperparameters: Option<Hyperparameters>,
}

impl Default for TrainRunOptions {
    fn default() -> Self {
        Self {
            algorithm: "logistic_regression".to_string(),
            max_samples: 10_000,
            start_date: None,
            end_date: None,
            hyperparameters: None,
        }
    }
}

/// Why a run failed without producing a deployable model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum FailureReason {
    InsufficientData { found: usize, required: usize },
    PerformanceBelowThreshold { accuracy: f64, threshold: f64 },
}

/// Structured failure outcome with diagnostics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingFailure {
    pub reason: FailureReason,
    /// Present for below-threshold runs so the attempt stays diagnosable
    pub metrics: Option<EvalReport>,
    pub recommendations: Vec<String>,
}

/// Result of a training request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TrainingOutcome {
    Success {
        model_id: String,
        version: String,
        metrics: EvalReport,
    },
    Failed(TrainingFailure),
}

impl TrainingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TrainingOutcome::Success { .. })
    }
}

/// End-to-end training pipeline over a shared registry
pub struct TrainingPipeline {
    config: PipelineConfig,
    extractor: FeatureExtractor,
    preparer: Preparer,
    trainer: Trainer,
    registry: Arc<ModelRegistry>,
}

impl TrainingPipeline {
    /// Pipeline without an external transport.
    ///
    /// The training strategy is decided by configuration: no endpoint means
    /// the local gradient-descent trainer. A configured endpoint with no
    /// backend to reach it is a contradiction and is rejected here rather
    /// than silently training locally.
    pub fn new(config: PipelineConfig, registry: Arc<ModelRegistry>) -> Result<Self> {
        if config.external_endpoint.is_some() {
            return Err(TrainingError::BackendMissing.into());
        }
        Ok(Self::with_trainer(config, registry, Trainer::local()))
    }

    /// Pipeline with a transport for the configured external endpoint,
    /// bounded by the configured timeout. When no endpoint is configured the
    /// backend is ignored and training stays local; the strategy follows the
    /// configuration, not the constructor choice.
    pub fn with_backend(
        config: PipelineConfig,
        registry: Arc<ModelRegistry>,
        backend: Box<dyn TrainerBackend>,
        algorithm: impl Into<String>,
    ) -> Self {
        let trainer = match config.external_endpoint.as_deref() {
            Some(endpoint) => {
                let timeout = std::time::Duration::from_secs(config.external_timeout_secs);
                info!(endpoint, "training delegated to external backend");
                Trainer::external(ExternalTrainer::new(backend, algorithm, timeout))
            }
            None => Trainer::local(),
        };
        Self::with_trainer(config, registry, trainer)
    }

    fn with_trainer(
        config: PipelineConfig,
        registry: Arc<ModelRegistry>,
        trainer: Trainer,
    ) -> Self {
        Self {
            config,
            extractor: FeatureExtractor::new(),
            preparer: Preparer::new(),
            trainer,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Run one training request synchronously.
    ///
    /// On success the model is persisted as `Trained`; deployment stays a
    /// separate, explicit step.
    pub fn train_new_model(
        &self,
        source: &dyn RecordSource,
        options: &TrainRunOptions,
    ) -> Result<TrainingOutcome> {
        let window = ExtractionWindow {
            start: options.start_date,
            end: options.end_date,
        };

        let mut pairs = source.fetch(&window).map_err(DataError::from)?;
        pairs.retain(|(loan, _)| window.contains(loan.created_at));
        pairs.truncate(options.max_samples);

        let raw = self.extractor.extract_batch(&pairs);
        let cleaned = self.preparer.prepare(&raw);
        info!(
            algorithm = self.trainer.algorithm(),
            requested = %options.algorithm,
            raw = raw.len(),
            cleaned = cleaned.len(),
            positives = cleaned.positives(),
            negatives = cleaned.negatives(),
            "training data prepared"
        );

        if cleaned.len() < self.config.min_samples {
            return Ok(TrainingOutcome::Failed(TrainingFailure {
                reason: FailureReason::InsufficientData {
                    found: cleaned.len(),
                    required: self.config.min_samples,
                },
                metrics: None,
                recommendations: vec![
                    "widen the extraction window".to_string(),
                    "raise max_samples".to_string(),
                    "check upstream data quality; cleaning dropped too many rows".to_string(),
                ],
            }));
        }

        let (train_set, validation_set) = split(
            &cleaned,
            self.config.validation_fraction,
            self.config.split_seed,
        )?;

        let hyperparameters = options
            .hyperparameters
            .clone()
            .unwrap_or_else(|| self.config.hyperparameters.clone());
        let model = self.trainer.train(&train_set, &validation_set, &hyperparameters)?;
        let report = evaluate(&model, &validation_set)?;

        if report.accuracy < self.config.performance_threshold {
            warn!(
                accuracy = report.accuracy,
                threshold = self.config.performance_threshold,
                "run below performance threshold; nothing persisted"
            );
            return Ok(TrainingOutcome::Failed(TrainingFailure {
                reason: FailureReason::PerformanceBelowThreshold {
                    accuracy: report.accuracy,
                    threshold: self.config.performance_threshold,
                },
                metrics: Some(report),
                recommendations: vec![
                    "extract a larger or more recent outcome window".to_string(),
                    "tune learning_rate / max_iterations".to_string(),
                    "review feature quality for the dominant importances".to_string(),
                ],
            }));
        }

        let baseline = FeatureBaseline::from_dataset(&train_set);
        let record = self
            .registry
            .register(model, report.clone(), Some(baseline))?;
        info!(model_id = %record.id, version = %record.version, accuracy = report.accuracy, "training run persisted");

        Ok(TrainingOutcome::Success {
            model_id: record.id,
            version: record.version,
            metrics: report,
        })
    }

    /// Run one training request on a worker thread.
    ///
    /// The registry is shared and internally synchronized; evaluation,
    /// inference, and drift checks keep running while this trains.
    pub fn train_new_model_background(
        self: &Arc<Self>,
        source: Arc<dyn RecordSource>,
        options: TrainRunOptions,
    ) -> JoinHandle<Result<TrainingOutcome>> {
        let pipeline = Arc::clone(self);
        std::thread::spawn(move || pipeline.train_new_model(source.as_ref(), &options))
    }

    /// Promote a trained model to serve live predictions
    pub fn deploy_model(&self, model_id: &str) -> crate::registry::Result<Deployment> {
        self.registry.deploy(model_id)
    }
}
