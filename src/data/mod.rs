//! Dataset preparation: cleaning, imputation, outlier removal, splitting
//!
//! Datasets are immutable values; every transformation here returns a new
//! [`Dataset`] and records what it did in the metadata.

mod dataset;
mod prepare;
mod split;

pub use dataset::{
    CleaningSummary, Dataset, DatasetMetadata, FeatureVector, ImputationTable, LabeledExample,
};
pub use prepare::{ImputeStrategy, Preparer};
pub use split::split;

use thiserror::Error;

/// Data-stage errors; individual bad records are skipped upstream, these
/// cover whole-dataset problems.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("dataset is empty")]
    EmptyDataset,

    #[error("validation fraction {0} outside (0, 1)")]
    InvalidSplitFraction(f64),

    #[error("record source failed: {0}")]
    Source(String),
}

/// Result alias for data-stage operations
pub type Result<T> = std::result::Result<T, DataError>;
