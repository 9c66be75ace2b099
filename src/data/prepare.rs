//! Dataset cleaning: critical-feature filtering, imputation, IQR outliers
//!
//! Three passes over an extracted dataset, in order:
//! 1. drop rows where a critical feature is missing or exactly zero,
//! 2. impute remaining missing values per a fixed feature -> strategy table,
//! 3. drop rows failing Tukey's IQR rule on any sufficiently-populated feature.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::dataset::{CleaningSummary, Dataset, DatasetMetadata, LabeledExample};

/// Fill-value strategy for a missing feature
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Mean of observed values
    Mean,
    /// Median of observed values
    Median,
    /// Most frequent observed value
    Mode,
    /// Constant zero
    Zero,
}

impl ImputeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ImputeStrategy::Mean => "mean",
            ImputeStrategy::Median => "median",
            ImputeStrategy::Mode => "mode",
            ImputeStrategy::Zero => "zero",
        }
    }
}

/// Features where zero is treated as "missing" and the row is dropped
const CRITICAL_FEATURES: [&str; 3] = ["monthly_income", "loan_amount", "age"];

/// Fixed imputation table: feature -> (strategy, domain default when no
/// historical aggregate exists). Unlisted features impute with Mean / 0.0.
fn imputation_table() -> Vec<(&'static str, ImputeStrategy, f64)> {
    vec![
        ("employment_months", ImputeStrategy::Median, 36.0),
        ("dependents", ImputeStrategy::Mode, 0.0),
        ("monthly_expenses", ImputeStrategy::Median, 1500.0),
        ("savings", ImputeStrategy::Median, 0.0),
        ("existing_debt", ImputeStrategy::Median, 0.0),
        ("term_months", ImputeStrategy::Mode, 24.0),
        ("engagement_score", ImputeStrategy::Mean, 0.5),
        ("response_hours", ImputeStrategy::Mean, 24.0),
        ("auto_payment", ImputeStrategy::Zero, 0.0),
    ]
}

/// Dataset cleaner. Construction captures the tunables; `prepare` is pure.
#[derive(Clone, Copy, Debug)]
pub struct Preparer {
    /// Features with more non-null values than this get the IQR check
    pub min_iqr_samples: usize,
    /// Tukey fence multiplier
    pub iqr_multiplier: f64,
}

impl Default for Preparer {
    fn default() -> Self {
        Self {
            min_iqr_samples: 10,
            iqr_multiplier: 1.5,
        }
    }
}

impl Preparer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean a raw dataset, returning a new one plus a cleaning summary in
    /// its metadata. Only removes rows, never adds.
    pub fn prepare(&self, dataset: &Dataset) -> Dataset {
        let input_rows = dataset.len();

        // Pass 1: critical features present and non-zero
        let mut survivors: Vec<LabeledExample> = Vec::with_capacity(input_rows);
        let mut dropped_missing_critical = 0usize;
        for example in dataset.examples() {
            let usable = CRITICAL_FEATURES.iter().all(|name| {
                example
                    .features
                    .get(*name)
                    .is_some_and(|v| v.is_finite() && *v != 0.0)
            });
            if usable {
                survivors.push(example.clone());
            } else {
                dropped_missing_critical += 1;
            }
        }

        // Pass 2: impute remaining missing values
        let table: BTreeMap<&str, (ImputeStrategy, f64)> = imputation_table()
            .into_iter()
            .map(|(name, strategy, fallback)| (name, (strategy, fallback)))
            .collect();
        let mut strategies = BTreeMap::new();
        let mut imputed_values = 0usize;
        for name in dataset.schema() {
            let (strategy, fallback) = table
                .get(name.as_str())
                .copied()
                .unwrap_or((ImputeStrategy::Mean, 0.0));
            let observed: Vec<f64> = survivors
                .iter()
                .filter_map(|ex| ex.features.get(name).copied())
                .filter(|v| v.is_finite())
                .collect();
            let fill = aggregate(&observed, strategy).unwrap_or(fallback);
            for example in &mut survivors {
                let value = example.features.entry(name.clone()).or_insert(f64::NAN);
                if !value.is_finite() {
                    *value = fill;
                    imputed_values += 1;
                }
            }
            strategies.insert(name.clone(), strategy.as_str().to_string());
        }

        // Pass 3: Tukey IQR fences, computed over the imputed survivors
        let mut fences: Vec<(String, f64, f64)> = Vec::new();
        for name in dataset.schema() {
            let mut values: Vec<f64> = survivors
                .iter()
                .filter_map(|ex| ex.features.get(name).copied())
                .filter(|v| v.is_finite())
                .collect();
            if values.len() <= self.min_iqr_samples {
                continue;
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let q1 = percentile(&values, 0.25);
            let q3 = percentile(&values, 0.75);
            let iqr = q3 - q1;
            fences.push((
                name.clone(),
                q1 - self.iqr_multiplier * iqr,
                q3 + self.iqr_multiplier * iqr,
            ));
        }

        let before_outliers = survivors.len();
        let kept: Vec<LabeledExample> = survivors
            .into_iter()
            .filter(|ex| {
                fences.iter().all(|(name, lo, hi)| {
                    ex.features
                        .get(name)
                        .map_or(true, |v| *v >= *lo && *v <= *hi)
                })
            })
            .collect();
        let dropped_outliers = before_outliers - kept.len();

        let summary = CleaningSummary {
            input_rows,
            kept_rows: kept.len(),
            dropped_missing_critical,
            dropped_outliers,
            imputed_values,
            strategies,
        };
        info!(
            input = input_rows,
            kept = kept.len(),
            ratio = summary.cleaning_ratio(),
            "dataset cleaned"
        );

        let mut metadata = dataset.metadata().clone();
        metadata.cleaning = Some(summary);
        Dataset::new(dataset.schema().to_vec(), kept, metadata)
    }
}

/// Aggregate observed values per strategy; `None` when nothing is observed
fn aggregate(values: &[f64], strategy: ImputeStrategy) -> Option<f64> {
    if values.is_empty() {
        return match strategy {
            ImputeStrategy::Zero => Some(0.0),
            _ => None,
        };
    }
    match strategy {
        ImputeStrategy::Zero => Some(0.0),
        ImputeStrategy::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        ImputeStrategy::Median => {
            let mut sorted = values.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            Some(percentile(&sorted, 0.5))
        }
        ImputeStrategy::Mode => {
            // Exact-value frequency; ties break toward the smaller value
            let mut counts: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
            for &v in values {
                let entry = counts.entry(v.to_bits()).or_insert((v, 0));
                entry.1 += 1;
            }
            counts
                .into_values()
                .max_by_key(|&(_, count)| count)
                .map(|(v, _)| v)
        }
    }
}

/// Linear-interpolated percentile over pre-sorted values
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::FeatureVector;

    fn make_example(income: f64, amount: f64, age: f64, extra: f64) -> LabeledExample {
        let mut features = FeatureVector::new();
        features.insert("monthly_income".to_string(), income);
        features.insert("loan_amount".to_string(), amount);
        features.insert("age".to_string(), age);
        features.insert("extra".to_string(), extra);
        LabeledExample {
            features,
            label: true,
        }
    }

    fn schema() -> Vec<String> {
        vec![
            "age".to_string(),
            "extra".to_string(),
            "loan_amount".to_string(),
            "monthly_income".to_string(),
        ]
    }

    fn make_dataset(examples: Vec<LabeledExample>) -> Dataset {
        let n = examples.len();
        Dataset::new(schema(), examples, DatasetMetadata::new(n, n))
    }

    #[test]
    fn test_drops_zero_critical() {
        let ds = make_dataset(vec![
            make_example(3000.0, 10000.0, 30.0, 1.0),
            make_example(0.0, 10000.0, 30.0, 1.0),    // zero income
            make_example(3000.0, f64::NAN, 30.0, 1.0), // missing amount
        ]);
        let cleaned = Preparer::new().prepare(&ds);
        assert_eq!(cleaned.len(), 1);
        let summary = cleaned.metadata().cleaning.as_ref().unwrap();
        assert_eq!(summary.dropped_missing_critical, 2);
    }

    #[test]
    fn test_imputes_missing_non_critical() {
        let mut rows = vec![
            make_example(3000.0, 10000.0, 30.0, 2.0),
            make_example(3200.0, 11000.0, 31.0, 4.0),
        ];
        rows.push(make_example(3100.0, 10500.0, 32.0, f64::NAN));
        let cleaned = Preparer::new().prepare(&make_dataset(rows));
        assert_eq!(cleaned.len(), 3);
        // "extra" defaults to Mean: (2 + 4) / 2 = 3
        let imputed = cleaned.examples()[2].features["extra"];
        assert!((imputed - 3.0).abs() < 1e-12);
        let summary = cleaned.metadata().cleaning.as_ref().unwrap();
        assert_eq!(summary.imputed_values, 1);
    }

    #[test]
    fn test_domain_fallback_when_no_aggregate() {
        // All employment_months missing: falls back to the domain default 36
        let mut features = FeatureVector::new();
        features.insert("monthly_income".to_string(), 3000.0);
        features.insert("loan_amount".to_string(), 9000.0);
        features.insert("age".to_string(), 40.0);
        features.insert("employment_months".to_string(), f64::NAN);
        let example = LabeledExample {
            features,
            label: false,
        };
        let ds = Dataset::new(
            vec![
                "age".to_string(),
                "employment_months".to_string(),
                "loan_amount".to_string(),
                "monthly_income".to_string(),
            ],
            vec![example],
            DatasetMetadata::new(1, 1),
        );
        let cleaned = Preparer::new().prepare(&ds);
        assert_eq!(cleaned.examples()[0].features["employment_months"], 36.0);
    }

    #[test]
    fn test_iqr_drops_outlier_row() {
        // 12 tight values plus one wild one; "extra" has >10 samples so the
        // fence applies and the outlier row is removed entirely.
        let mut rows: Vec<LabeledExample> = (0..12)
            .map(|i| make_example(3000.0 + i as f64, 10000.0, 30.0, 50.0 + i as f64))
            .collect();
        rows.push(make_example(3000.0, 10000.0, 30.0, 10_000.0));
        let cleaned = Preparer::new().prepare(&make_dataset(rows));
        assert_eq!(cleaned.len(), 12);
        let summary = cleaned.metadata().cleaning.as_ref().unwrap();
        assert_eq!(summary.dropped_outliers, 1);
    }

    #[test]
    fn test_small_features_skip_iqr() {
        // Only 3 rows: below the >10 sample requirement, nothing dropped
        let rows = vec![
            make_example(3000.0, 10000.0, 30.0, 1.0),
            make_example(3100.0, 10000.0, 31.0, 2.0),
            make_example(3200.0, 10000.0, 32.0, 1_000_000.0),
        ];
        let cleaned = Preparer::new().prepare(&make_dataset(rows));
        assert_eq!(cleaned.len(), 3);
    }

    #[test]
    fn test_strategy_table_recorded() {
        let ds = make_dataset(vec![make_example(3000.0, 10000.0, 30.0, 1.0)]);
        let cleaned = Preparer::new().prepare(&ds);
        let summary = cleaned.metadata().cleaning.as_ref().unwrap();
        assert_eq!(summary.strategies.get("extra").map(String::as_str), Some("mean"));
        assert_eq!(summary.strategies.len(), 4);
    }

    #[test]
    fn test_percentile_interpolation() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        approx::assert_relative_eq!(percentile(&values, 0.25), 1.75);
        approx::assert_relative_eq!(percentile(&values, 0.5), 2.5);
        approx::assert_relative_eq!(percentile(&values, 0.75), 3.25);
    }

    #[test]
    fn test_aggregate_mode() {
        let values = vec![2.0, 1.0, 2.0, 3.0, 2.0];
        assert_eq!(aggregate(&values, ImputeStrategy::Mode), Some(2.0));
    }

    #[test]
    fn test_aggregate_empty() {
        assert_eq!(aggregate(&[], ImputeStrategy::Mean), None);
        assert_eq!(aggregate(&[], ImputeStrategy::Zero), Some(0.0));
    }
}
