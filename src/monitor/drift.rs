//! Drift monitor
//!
//! Runs independently of the training pipeline against whatever model is
//! currently deployed. Live feature vectors are fed in through `observe`;
//! `check` scores the recent window against the deployed record's stored
//! baseline, classifies, persists the report, and fires alert callbacks on
//! critical drift. A check never fails its caller: missing deployments and
//! missing baselines degrade to dedicated report statuses.

use std::collections::{BTreeMap, VecDeque};

use tracing::{info, warn};

use super::{DriftReport, DriftStatus};
use crate::config::DriftThresholds;
use crate::data::FeatureVector;
use crate::registry::ModelRegistry;

/// Best-effort alert sink invoked on critical drift
pub type AlertCallback = Box<dyn Fn(&DriftReport) + Send + Sync>;

/// Sliding-window drift monitor for the deployed model
pub struct DriftMonitor {
    thresholds: DriftThresholds,
    window_size: usize,
    window: VecDeque<FeatureVector>,
    callbacks: Vec<AlertCallback>,
}

impl DriftMonitor {
    pub fn new(thresholds: DriftThresholds) -> Self {
        Self {
            thresholds,
            window_size: 500,
            window: VecDeque::new(),
            callbacks: Vec::new(),
        }
    }

    /// Cap the live observation window
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = size.max(1);
        self
    }

    /// Register a callback fired when a check classifies as critical.
    ///
    /// Alerting is a side channel: callbacks must not block, and whatever
    /// they do cannot fail the check.
    pub fn on_alert<F>(&mut self, callback: F)
    where
        F: Fn(&DriftReport) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Record one live feature vector (typically mirrored from inference)
    pub fn observe(&mut self, features: FeatureVector) {
        if self.window.len() >= self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(features);
    }

    pub fn observed(&self) -> usize {
        self.window.len()
    }

    /// Run one drift check against the registry's deployed model.
    ///
    /// The latest report overwrites the record's drift metrics. Never
    /// returns an error: degraded situations map to report statuses.
    pub fn check(&self, registry: &ModelRegistry) -> DriftReport {
        let Some(record) = registry.deployed() else {
            return DriftReport::new(None, 0.0, DriftStatus::NoActiveModel);
        };

        let report = match &record.baseline {
            None => {
                warn!(model_id = %record.id, "deployed model has no baseline");
                DriftReport::new(Some(record.id.clone()), 0.0, DriftStatus::CannotAssess)
            }
            Some(baseline) => match baseline.mean_psi(&self.window_columns()) {
                None => DriftReport::new(Some(record.id.clone()), 0.0, DriftStatus::CannotAssess),
                Some(score) => {
                    let status = self.classify(score);
                    info!(model_id = %record.id, score, status = %status, "drift check");
                    DriftReport::new(Some(record.id.clone()), score, status)
                }
            },
        };

        if registry.record_drift(&record.id, report.clone()).is_err() {
            warn!(model_id = %record.id, "could not persist drift report");
        }

        if report.status == DriftStatus::Critical {
            for callback in &self.callbacks {
                callback(&report);
            }
        }

        report
    }

    /// Classify a score against the configured thresholds
    pub fn classify(&self, score: f64) -> DriftStatus {
        if score > self.thresholds.critical {
            DriftStatus::Critical
        } else if score > self.thresholds.warning {
            DriftStatus::Warning
        } else if score > self.thresholds.monitoring {
            DriftStatus::Monitoring
        } else {
            DriftStatus::Stable
        }
    }

    /// Transpose the live window into per-feature columns
    fn window_columns(&self) -> BTreeMap<String, Vec<f64>> {
        let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for features in &self.window {
            for (name, &value) in features {
                columns.entry(name.clone()).or_default().push(value);
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, DatasetMetadata, LabeledExample};
    use crate::eval::{ConfusionCounts, EvalReport};
    use crate::monitor::FeatureBaseline;
    use crate::train::{Hyperparameters, ModelParams, TrainedModel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn thresholds() -> DriftThresholds {
        DriftThresholds::default()
    }

    fn vector(value: f64) -> FeatureVector {
        FeatureVector::from([("x".to_string(), value)])
    }

    fn training_dataset(values: &[f64]) -> Dataset {
        let examples: Vec<LabeledExample> = values
            .iter()
            .map(|&v| LabeledExample {
                features: vector(v),
                label: false,
            })
            .collect();
        let n = examples.len();
        Dataset::new(vec!["x".to_string()], examples, DatasetMetadata::new(n, n))
    }

    fn register_deployed(registry: &ModelRegistry, baseline: Option<FeatureBaseline>) -> String {
        let model = TrainedModel {
            algorithm: "logistic_regression".to_string(),
            params: ModelParams {
                weights: vec![1.0],
                intercept: 0.0,
                raw: None,
            },
            importance: BTreeMap::new(),
            options: Hyperparameters::default(),
            schema: vec!["x".to_string()],
        };
        let metrics = EvalReport {
            accuracy: 0.9,
            precision: 0.9,
            recall: 0.9,
            f1: 0.9,
            auc: 0.9,
            confusion: ConfusionCounts::default(),
            n_examples: 10,
        };
        let id = registry.register(model, metrics, baseline).unwrap().id;
        registry.deploy(&id).unwrap();
        id
    }

    #[test]
    fn test_classify_thresholds() {
        let monitor = DriftMonitor::new(thresholds());
        assert_eq!(monitor.classify(0.12), DriftStatus::Critical);
        assert_eq!(monitor.classify(0.07), DriftStatus::Warning);
        assert_eq!(monitor.classify(0.03), DriftStatus::Monitoring);
        assert_eq!(monitor.classify(0.01), DriftStatus::Stable);
        // Boundaries are strict
        assert_eq!(monitor.classify(0.10), DriftStatus::Warning);
        assert_eq!(monitor.classify(0.02), DriftStatus::Stable);
    }

    #[test]
    fn test_no_active_model_report() {
        let registry = ModelRegistry::new();
        let monitor = DriftMonitor::new(thresholds());
        let report = monitor.check(&registry);
        assert_eq!(report.status, DriftStatus::NoActiveModel);
        assert_eq!(report.recommendation, "deploy_model");
        assert!(report.model_id.is_none());
    }

    #[test]
    fn test_missing_baseline_cannot_assess() {
        let registry = ModelRegistry::new();
        register_deployed(&registry, None);
        let monitor = DriftMonitor::new(thresholds());
        let report = monitor.check(&registry);
        assert_eq!(report.status, DriftStatus::CannotAssess);
    }

    #[test]
    fn test_empty_window_cannot_assess() {
        let registry = ModelRegistry::new();
        let baseline = FeatureBaseline::from_dataset(&training_dataset(
            &(0..100).map(f64::from).collect::<Vec<_>>(),
        ));
        register_deployed(&registry, Some(baseline));
        let monitor = DriftMonitor::new(thresholds());
        assert_eq!(monitor.check(&registry).status, DriftStatus::CannotAssess);
    }

    #[test]
    fn test_stable_window_and_report_persisted() {
        let registry = ModelRegistry::new();
        let values: Vec<f64> = (0..200).map(f64::from).collect();
        let baseline = FeatureBaseline::from_dataset(&training_dataset(&values));
        let id = register_deployed(&registry, Some(baseline));

        let mut monitor = DriftMonitor::new(thresholds());
        for &v in &values {
            monitor.observe(vector(v));
        }
        let report = monitor.check(&registry);
        assert_eq!(report.status, DriftStatus::Stable);
        assert_eq!(report.recommendation, "continue_monitoring");

        let stored = registry.get(&id).unwrap().drift.unwrap();
        assert_eq!(stored.status, DriftStatus::Stable);
    }

    #[test]
    fn test_shifted_window_alerts_critical() {
        let registry = ModelRegistry::new();
        let train: Vec<f64> = (0..200).map(f64::from).collect();
        let baseline = FeatureBaseline::from_dataset(&training_dataset(&train));
        register_deployed(&registry, Some(baseline));

        let alerts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&alerts);
        let mut monitor = DriftMonitor::new(thresholds());
        monitor.on_alert(move |_report| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        for v in 900..1100 {
            monitor.observe(vector(f64::from(v)));
        }

        let report = monitor.check(&registry);
        assert_eq!(report.status, DriftStatus::Critical);
        assert_eq!(report.recommendation, "immediate_retraining");
        assert_eq!(alerts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_latest_report_overwrites() {
        let registry = ModelRegistry::new();
        let train: Vec<f64> = (0..200).map(f64::from).collect();
        let baseline = FeatureBaseline::from_dataset(&training_dataset(&train));
        let id = register_deployed(&registry, Some(baseline));

        let mut monitor = DriftMonitor::new(thresholds());
        for v in 900..1100 {
            monitor.observe(vector(f64::from(v)));
        }
        monitor.check(&registry);
        assert_eq!(
            registry.get(&id).unwrap().drift.unwrap().status,
            DriftStatus::Critical
        );

        // Window rolls back to the training distribution
        let mut monitor = DriftMonitor::new(thresholds());
        for &v in &train {
            monitor.observe(vector(v));
        }
        monitor.check(&registry);
        assert_eq!(
            registry.get(&id).unwrap().drift.unwrap().status,
            DriftStatus::Stable
        );
    }

    #[test]
    fn test_window_caps_observations() {
        let mut monitor = DriftMonitor::new(thresholds()).with_window_size(10);
        for v in 0..25 {
            monitor.observe(vector(f64::from(v)));
        }
        assert_eq!(monitor.observed(), 10);
    }
}
