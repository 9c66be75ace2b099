//! Binary classification evaluation
//!
//! Scores a fitted model against a validation subset: confusion counts,
//! accuracy, precision, recall, F1 (all defined as 0 rather than NaN on a
//! zero denominator), and rank-based AUC.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::Dataset;
use crate::train::{TrainedModel, TrainingError};

/// Decision threshold for binarizing probabilities
pub const CLASS_THRESHOLD: f64 = 0.5;

/// Evaluation-stage errors
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("validation set is empty")]
    EmptyValidationSet,

    #[error(transparent)]
    Prediction(#[from] TrainingError),
}

/// Result alias for evaluation operations
pub type Result<T> = std::result::Result<T, EvalError>;

/// Binary confusion counts at the 0.5 threshold
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Immutable evaluation result, constructed once and returned
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvalReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub auc: f64,
    pub confusion: ConfusionCounts,
    pub n_examples: usize,
}

/// Evaluate a model against a validation set.
///
/// Each example is scored as a probability and binarized at 0.5.
pub fn evaluate(model: &TrainedModel, validation: &Dataset) -> Result<EvalReport> {
    if validation.is_empty() {
        return Err(EvalError::EmptyValidationSet);
    }

    let mut scores = Vec::with_capacity(validation.len());
    let mut labels = Vec::with_capacity(validation.len());
    let mut confusion = ConfusionCounts::default();

    for (row, example) in validation.rows().iter().zip(validation.examples()) {
        let probability = model.predict_row(row)?;
        let predicted = probability >= CLASS_THRESHOLD;
        match (predicted, example.label) {
            (true, true) => confusion.tp += 1,
            (false, false) => confusion.tn += 1,
            (true, false) => confusion.fp += 1,
            (false, true) => confusion.fn_ += 1,
        }
        scores.push(probability);
        labels.push(example.label);
    }

    let total = confusion.total() as f64;
    let accuracy = (confusion.tp + confusion.tn) as f64 / total;
    let precision = safe_rate(confusion.tp, confusion.tp + confusion.fp);
    let recall = safe_rate(confusion.tp, confusion.tp + confusion.fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(EvalReport {
        accuracy,
        precision,
        recall,
        f1,
        auc: roc_auc(&labels, &scores),
        confusion,
        n_examples: validation.len(),
    })
}

/// `numerator / denominator`, defined as 0 when the denominator is 0
fn safe_rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Rank-based AUC: sort by score descending and accumulate the positives
/// seen so far each time a negative is encountered. Returns 0.5 (chance
/// level) when either class is absent.
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> f64 {
    debug_assert_eq!(labels.len(), scores.len());

    let positives = labels.iter().filter(|&&l| l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut positives_seen = 0usize;
    let mut auc = 0usize;
    for &i in &order {
        if labels[i] {
            positives_seen += 1;
        } else {
            auc += positives_seen;
        }
    }

    auc as f64 / (positives * negatives) as f64
}
