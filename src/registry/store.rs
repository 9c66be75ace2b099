//! In-memory, internally synchronized model store
//!
//! All state lives behind one `Mutex`, making every lifecycle transition a
//! single critical section. That is what upholds the at-most-one-deployed
//! invariant under concurrent deploy requests: whichever caller enters the
//! section second sees the first winner already deployed and demotes it (or
//! fails its own precondition) atomically.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::record::{Deployment, ModelRecord};
use super::status::ModelStatus;
use super::{RegistryError, Result};
use crate::data::FeatureVector;
use crate::eval::{EvalReport, CLASS_THRESHOLD};
use crate::monitor::{DriftReport, FeatureBaseline};
use crate::train::TrainedModel;

/// Inference result for one feature vector
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Prediction {
    /// Probability of repayment
    pub probability: f64,
    /// `probability >= 0.5`
    pub class: bool,
    /// Record that served the prediction
    pub model_id: String,
}

#[derive(Default)]
struct RegistryState {
    records: BTreeMap<String, ModelRecord>,
    next_seq: u64,
    /// Per-day version disambiguators, keyed by `YYYYMMDD`
    day_counters: BTreeMap<String, u32>,
}

impl RegistryState {
    fn next_id(&mut self) -> String {
        self.next_seq += 1;
        format!("mdl-{:06}", self.next_seq)
    }

    fn next_version(&mut self) -> String {
        let day = Utc::now().format("%Y%m%d").to_string();
        let counter = self.day_counters.entry(day.clone()).or_insert(0);
        *counter += 1;
        format!("v{day}-{counter:03}")
    }

    fn deployed_id(&self) -> Option<String> {
        self.records
            .values()
            .find(|r| r.status == ModelStatus::Deployed)
            .map(|r| r.id.clone())
    }
}

/// Thread-safe model registry enforcing the deployment state machine
#[derive(Default)]
pub struct ModelRegistry {
    state: Mutex<RegistryState>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist a trained, evaluated model as `Trained`.
    ///
    /// The version token is unique and sortable; ids are never reused.
    pub fn register(
        &self,
        model: TrainedModel,
        metrics: EvalReport,
        baseline: Option<FeatureBaseline>,
    ) -> Result<ModelRecord> {
        let mut state = self.state.lock().expect("registry lock poisoned");
        let id = state.next_id();
        let version = state.next_version();
        let record = ModelRecord {
            id: id.clone(),
            version: version.clone(),
            status: ModelStatus::Trained,
            model,
            metrics,
            baseline,
            created_at: Utc::now(),
            deployed_at: None,
            retired_at: None,
            usage_count: 0,
            last_used_at: None,
            drift: None,
        };
        state.records.insert(id.clone(), record.clone());
        info!(model_id = %id, %version, "model registered");
        Ok(record)
    }

    /// Fetch one record by id
    pub fn get(&self, id: &str) -> Result<ModelRecord> {
        let state = self.state.lock().expect("registry lock poisoned");
        state
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))
    }

    /// All records, in id order (retired included, for audit)
    pub fn list(&self) -> Vec<ModelRecord> {
        let state = self.state.lock().expect("registry lock poisoned");
        state.records.values().cloned().collect()
    }

    /// The currently deployed record, if any
    pub fn deployed(&self) -> Option<ModelRecord> {
        let state = self.state.lock().expect("registry lock poisoned");
        state
            .records
            .values()
            .find(|r| r.status == ModelStatus::Deployed)
            .cloned()
    }

    /// Promote a `Trained` record to `Deployed`, atomically demoting any
    /// previously deployed record to `Retired` in the same transaction.
    ///
    /// Rejected (leaving all state unchanged) when the target is missing or
    /// not in `Trained` status.
    pub fn deploy(&self, id: &str) -> Result<Deployment> {
        let mut state = self.state.lock().expect("registry lock poisoned");

        // Validate the target before touching anything
        let target_status = state
            .records
            .get(id)
            .map(|r| r.status)
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))?;
        if !target_status.can_transition_to(ModelStatus::Deployed) {
            return Err(RegistryError::InvalidTransition(
                target_status,
                ModelStatus::Deployed,
            ));
        }

        let now = Utc::now();
        if let Some(previous_id) = state.deployed_id() {
            let previous = state
                .records
                .get_mut(&previous_id)
                .expect("deployed id resolves");
            previous.status = ModelStatus::Retired;
            previous.retired_at = Some(now);
            info!(model_id = %previous_id, "previous model demoted");
        }

        let record = state.records.get_mut(id).expect("target validated above");
        record.status = ModelStatus::Deployed;
        record.deployed_at = Some(now);
        info!(model_id = %id, version = %record.version, "model deployed");

        Ok(Deployment {
            model_id: record.id.clone(),
            version: record.version.clone(),
            deployed_at: now,
        })
    }

    /// Retire a `Deployed` or `Trained` record. The record stays readable.
    pub fn retire(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().expect("registry lock poisoned");
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))?;
        if !record.status.can_transition_to(ModelStatus::Retired) {
            return Err(RegistryError::InvalidTransition(
                record.status,
                ModelStatus::Retired,
            ));
        }
        record.status = ModelStatus::Retired;
        record.retired_at = Some(Utc::now());
        info!(model_id = %id, "model retired");
        Ok(())
    }

    /// Score one feature vector against the deployed model.
    ///
    /// Deterministic given identical parameters and features. A missing
    /// deployment is a defined error, never a panic. Updates the record's
    /// usage counter and last-used stamp.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let mut state = self.state.lock().expect("registry lock poisoned");
        let id = state.deployed_id().ok_or(RegistryError::NoDeployedModel)?;
        let record = state.records.get_mut(&id).expect("deployed id resolves");

        let mut row = Vec::with_capacity(record.model.schema.len());
        for name in &record.model.schema {
            let value = features
                .get(name)
                .copied()
                .ok_or_else(|| RegistryError::MissingFeature(name.clone()))?;
            row.push(value);
        }
        let probability = record
            .model
            .predict_row(&row)
            .map_err(|e| RegistryError::Inference(e.to_string()))?;

        record.usage_count += 1;
        record.last_used_at = Some(Utc::now());

        Ok(Prediction {
            probability,
            class: probability >= CLASS_THRESHOLD,
            model_id: id,
        })
    }

    /// Overwrite a record's latest drift report
    pub fn record_drift(&self, id: &str, report: DriftReport) -> Result<()> {
        let mut state = self.state.lock().expect("registry lock poisoned");
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| RegistryError::ModelNotFound(id.to_string()))?;
        record.drift = Some(report);
        Ok(())
    }

    /// Full record as a structured document for audit/download
    pub fn export(&self, id: &str) -> Result<serde_json::Value> {
        let record = self.get(id)?;
        serde_json::to_value(&record).map_err(|e| RegistryError::Export(e.to_string()))
    }
}
