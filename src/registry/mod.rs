//! Model registry and deployment state machine
//!
//! Owns every [`ModelRecord`] from registration to retirement and enforces
//! the lifecycle invariant: at most one record is `Deployed` at any time.
//! Deploy/retire transitions run inside one critical section, so concurrent
//! deploy requests race safely to exactly one winner.
//!
//! Persistence technology is a collaborator concern; this store is
//! in-memory and internally synchronized so it can be shared behind an
//! `Arc` between the training pipeline, inference callers, and the drift
//! monitor.

mod record;
mod status;
mod store;

pub use record::{Deployment, ModelRecord};
pub use status::ModelStatus;
pub use store::{ModelRegistry, Prediction};

use thiserror::Error;

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("invalid transition from {0} to {1}")]
    InvalidTransition(ModelStatus, ModelStatus),

    #[error("no model is deployed")]
    NoDeployedModel,

    #[error("feature vector missing '{0}'")]
    MissingFeature(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("export failed: {0}")]
    Export(String),
}

/// Result alias for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
