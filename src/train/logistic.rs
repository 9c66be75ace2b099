//! Local logistic-regression trainer
//!
//! Batch gradient descent over a design matrix with an explicit bias column
//! of 1.0 prepended to each feature row. Weights start at zero; the loop
//! stops early once the max absolute gradient drops below the configured
//! tolerance. Non-convergence is not an error: the best-so-far weights are
//! returned.

use std::collections::BTreeMap;

use tracing::debug;

use super::{
    sigmoid, Hyperparameters, ModelParams, Result, TrainedModel, TrainingError,
};
use crate::data::Dataset;

/// Batch gradient-descent logistic regression
#[derive(Clone, Copy, Debug, Default)]
pub struct LogisticTrainer;

impl LogisticTrainer {
    pub fn new() -> Self {
        Self
    }

    pub fn train(&self, train_set: &Dataset, options: &Hyperparameters) -> Result<TrainedModel> {
        if train_set.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }

        let rows = train_set.rows();
        let n_samples = rows.len();
        let n_features = train_set.schema().len();

        // Design matrix with bias column prepended
        let design: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| {
                let mut x = Vec::with_capacity(n_features + 1);
                x.push(1.0);
                x.extend_from_slice(row);
                x
            })
            .collect();
        let labels: Vec<f64> = train_set
            .examples()
            .iter()
            .map(|ex| if ex.label { 1.0 } else { 0.0 })
            .collect();

        let mut weights = vec![0.0f64; n_features + 1];
        let mut iterations = 0usize;
        let mut converged = false;

        for iter in 0..options.max_iterations {
            iterations = iter + 1;

            // gradient_j = mean over samples of (prediction - label) * x_j
            let mut gradient = vec![0.0f64; n_features + 1];
            for (x, &y) in design.iter().zip(labels.iter()) {
                let z: f64 = weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum();
                let residual = sigmoid(z) - y;
                for (g, v) in gradient.iter_mut().zip(x.iter()) {
                    *g += residual * v;
                }
            }
            let mut max_gradient = 0.0f64;
            for g in &mut gradient {
                *g /= n_samples as f64;
                max_gradient = max_gradient.max(g.abs());
            }

            for (w, g) in weights.iter_mut().zip(gradient.iter()) {
                *w -= options.learning_rate * g;
            }

            if max_gradient < options.tolerance {
                converged = true;
                break;
            }
        }

        debug!(iterations, converged, "logistic regression fitted");

        let intercept = weights[0];
        let feature_weights = weights[1..].to_vec();
        let importance = importance_from_weights(train_set.schema(), &feature_weights);

        Ok(TrainedModel {
            algorithm: "logistic_regression".to_string(),
            params: ModelParams {
                weights: feature_weights,
                intercept,
                raw: None,
            },
            importance,
            options: options.clone(),
            schema: train_set.schema().to_vec(),
        })
    }
}

/// |weight| per feature, normalized so the dominant feature scores 1.0
fn importance_from_weights(schema: &[String], weights: &[f64]) -> BTreeMap<String, f64> {
    let max_abs = weights.iter().fold(0.0f64, |acc, w| acc.max(w.abs()));
    schema
        .iter()
        .zip(weights.iter())
        .map(|(name, w)| {
            let score = if max_abs > 0.0 { w.abs() / max_abs } else { 0.0 };
            (name.clone(), score)
        })
        .collect()
}
