//! Crate-level error type
//!
//! Each module defines its own error enum; this aggregates them for callers
//! that drive the whole pipeline.

use thiserror::Error;

use crate::data::DataError;
use crate::eval::EvalError;
use crate::registry::RegistryError;
use crate::train::TrainingError;

/// Top-level error for pipeline operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
