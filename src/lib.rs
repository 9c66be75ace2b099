//! # prestar
//!
//! Credit-scoring model lifecycle subsystem: extracts training examples from
//! historical loan outcomes, cleans and splits them, fits a binary classifier,
//! evaluates it, persists it under a versioned registry with an
//! at-most-one-deployed state machine, and monitors the deployed model for
//! performance decay.
//!
//! The surrounding system (request routing, record editing, notifications) is
//! a collaborator: it supplies raw loan/customer records through a
//! [`RecordSource`](pipeline::RecordSource) and consumes the structured
//! results (predictions, metrics, deployment events) produced here.
//!
//! # Pipeline
//!
//! ```text
//! RecordSource -> extract -> prepare -> split -> train -> evaluate -> registry
//!                                                                       |
//!                                 DriftMonitor <-- deployed model <------+
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use prestar::{PipelineConfig, TrainingPipeline, TrainRunOptions};
//! use prestar::registry::ModelRegistry;
//!
//! let registry = Arc::new(ModelRegistry::new());
//! let pipeline = TrainingPipeline::new(PipelineConfig::default(), Arc::clone(&registry))?;
//! let outcome = pipeline.train_new_model(&source, &TrainRunOptions::default())?;
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod features;
pub mod monitor;
pub mod pipeline;
pub mod registry;
pub mod train;

pub use config::{DriftThresholds, PipelineConfig};
pub use data::{Dataset, Preparer};
pub use error::{Error, Result};
pub use eval::{evaluate, EvalReport};
pub use features::{CustomerRecord, FeatureExtractor, LoanRecord, LoanStatus};
pub use monitor::{DriftMonitor, DriftReport, DriftStatus};
pub use pipeline::{
    RecordSource, TrainRunOptions, TrainingFailure, TrainingOutcome, TrainingPipeline,
};
pub use registry::{ModelRecord, ModelRegistry, ModelStatus, Prediction};
pub use train::{Hyperparameters, TrainedModel, Trainer};
