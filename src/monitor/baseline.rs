//! Training-time feature distribution baseline
//!
//! Per feature: decile bin edges computed from the training set plus the
//! fraction of training mass in each bin. Stored on the model record so
//! drift checks never re-read training data. Comparison uses the
//! Population Stability Index with small-count smoothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::Dataset;

const N_BINS: usize = 10;

/// Decile histogram for one feature
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaselineBins {
    /// `N_BINS + 1` edges; first is -inf, last is +inf
    edges: Vec<f64>,
    /// Fraction of baseline mass per bin
    fractions: Vec<f64>,
}

impl BaselineBins {
    fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut edges = Vec::with_capacity(N_BINS + 1);
        edges.push(f64::NEG_INFINITY);
        for i in 1..N_BINS {
            let idx = (sorted.len() * i / N_BINS).min(sorted.len().saturating_sub(1));
            edges.push(sorted.get(idx).copied().unwrap_or(0.0));
        }
        edges.push(f64::INFINITY);

        let counts = bin_counts(&sorted, &edges);
        let total = sorted.len().max(1) as f64;
        let fractions = counts.iter().map(|&c| c as f64 / total).collect();

        Self { edges, fractions }
    }

    /// PSI of `current` against this baseline histogram
    fn psi(&self, current: &[f64]) -> f64 {
        let counts = bin_counts(current, &self.edges);
        let total = current.len().max(1) as f64;

        let mut psi = 0.0;
        for (frac, &count) in self.fractions.iter().zip(counts.iter()) {
            // Smoothing keeps empty bins from blowing up the log term
            let expected = frac + 1e-4;
            let actual = count as f64 / total + 1e-4;
            psi += (actual - expected) * (actual / expected).ln();
        }
        psi.max(0.0)
    }
}

/// Per-feature baseline distributions captured at training time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeatureBaseline {
    features: BTreeMap<String, BaselineBins>,
    /// Training rows the baseline was computed from
    pub sample_count: usize,
}

impl FeatureBaseline {
    /// Capture baselines for every schema feature of the training set
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut features = BTreeMap::new();
        for name in dataset.schema() {
            let values: Vec<f64> = dataset
                .examples()
                .iter()
                .filter_map(|ex| ex.features.get(name).copied())
                .collect();
            features.insert(name.clone(), BaselineBins::from_values(&values));
        }
        Self {
            features,
            sample_count: dataset.len(),
        }
    }

    /// Mean per-feature PSI against a live window of feature columns.
    ///
    /// Only features present in both sides contribute; `None` when there is
    /// no overlap to compare.
    pub fn mean_psi(&self, live: &BTreeMap<String, Vec<f64>>) -> Option<f64> {
        let mut total = 0.0;
        let mut compared = 0usize;
        for (name, bins) in &self.features {
            if let Some(values) = live.get(name) {
                if !values.is_empty() {
                    total += bins.psi(values);
                    compared += 1;
                }
            }
        }
        (compared > 0).then(|| total / compared as f64)
    }
}

fn bin_counts(values: &[f64], edges: &[f64]) -> Vec<usize> {
    let mut counts = vec![0usize; edges.len() - 1];
    for &v in values {
        if !v.is_finite() {
            continue;
        }
        for i in 0..counts.len() {
            if v > edges[i] && v <= edges[i + 1] {
                counts[i] += 1;
                break;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetMetadata, FeatureVector, LabeledExample};

    fn dataset(values: &[f64]) -> Dataset {
        let examples: Vec<LabeledExample> = values
            .iter()
            .map(|&v| {
                let mut features = FeatureVector::new();
                features.insert("x".to_string(), v);
                LabeledExample {
                    features,
                    label: false,
                }
            })
            .collect();
        let n = examples.len();
        Dataset::new(vec!["x".to_string()], examples, DatasetMetadata::new(n, n))
    }

    #[test]
    fn test_same_distribution_near_zero_psi() {
        let values: Vec<f64> = (0..200).map(f64::from).collect();
        let baseline = FeatureBaseline::from_dataset(&dataset(&values));
        let live = BTreeMap::from([("x".to_string(), values)]);
        let psi = baseline.mean_psi(&live).unwrap();
        assert!(psi < 0.02, "psi {psi} should be near zero");
    }

    #[test]
    fn test_shifted_distribution_high_psi() {
        let train: Vec<f64> = (0..200).map(f64::from).collect();
        let shifted: Vec<f64> = (500..700).map(f64::from).collect();
        let baseline = FeatureBaseline::from_dataset(&dataset(&train));
        let live = BTreeMap::from([("x".to_string(), shifted)]);
        let psi = baseline.mean_psi(&live).unwrap();
        assert!(psi > 0.10, "psi {psi} should cross the critical threshold");
    }

    #[test]
    fn test_no_overlap_gives_none() {
        let baseline = FeatureBaseline::from_dataset(&dataset(&[1.0, 2.0, 3.0]));
        let live = BTreeMap::from([("other".to_string(), vec![1.0])]);
        assert!(baseline.mean_psi(&live).is_none());
        assert!(baseline.mean_psi(&BTreeMap::new()).is_none());
    }

    #[test]
    fn test_psi_non_negative() {
        let baseline = FeatureBaseline::from_dataset(&dataset(&[1.0, 1.0, 1.0, 2.0]));
        let live = BTreeMap::from([("x".to_string(), vec![1.0, 2.0])]);
        assert!(baseline.mean_psi(&live).unwrap() >= 0.0);
    }

    #[test]
    fn test_sample_count_recorded() {
        let baseline = FeatureBaseline::from_dataset(&dataset(&[1.0, 2.0, 3.0]));
        assert_eq!(baseline.sample_count, 3);
    }
}
