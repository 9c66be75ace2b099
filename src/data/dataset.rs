//! Dataset value types
//!
//! A [`Dataset`] is an ordered sequence of labeled examples plus the fixed
//! feature-name schema and extraction/cleaning metadata. Datasets are never
//! mutated in place: cleaning and splitting produce new values.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered feature name -> value mapping.
///
/// Missing values are carried as `NaN` until the preparer imputes or drops
/// them; every vector in a dataset has the same key set.
pub type FeatureVector = BTreeMap<String, f64>;

/// A feature vector plus its binary outcome label. Immutable once extracted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabeledExample {
    /// Extracted features, keyed by schema name
    pub features: FeatureVector,
    /// `true` iff the loan was fully repaid
    pub label: bool,
}

/// Per-feature imputation choices recorded for reproducibility
pub type ImputationTable = BTreeMap<String, String>;

/// Summary of what the preparer did to a dataset
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Rows in the raw dataset
    pub input_rows: usize,
    /// Rows surviving all cleaning steps
    pub kept_rows: usize,
    /// Rows dropped for a missing/zero critical feature
    pub dropped_missing_critical: usize,
    /// Rows dropped by the IQR outlier rule
    pub dropped_outliers: usize,
    /// Individual values filled in by imputation
    pub imputed_values: usize,
    /// Feature -> strategy actually applied
    pub strategies: ImputationTable,
}

impl CleaningSummary {
    /// Fraction of input rows kept (1.0 for an empty input)
    pub fn cleaning_ratio(&self) -> f64 {
        if self.input_rows == 0 {
            1.0
        } else {
            self.kept_rows as f64 / self.input_rows as f64
        }
    }
}

/// Extraction and cleaning provenance for a dataset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Raw (loan, customer) pairs offered to the extractor
    pub source_count: usize,
    /// Pairs successfully turned into examples
    pub extracted_count: usize,
    /// `extracted_count / source_count` (1.0 for an empty source)
    pub success_ratio: f64,
    /// When extraction ran
    pub extracted_at: DateTime<Utc>,
    /// Present once the preparer has run
    pub cleaning: Option<CleaningSummary>,
}

impl DatasetMetadata {
    pub fn new(source_count: usize, extracted_count: usize) -> Self {
        let success_ratio = if source_count == 0 {
            1.0
        } else {
            extracted_count as f64 / source_count as f64
        };
        Self {
            source_count,
            extracted_count,
            success_ratio,
            extracted_at: Utc::now(),
            cleaning: None,
        }
    }
}

/// Ordered collection of labeled examples sharing one feature schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dataset {
    schema: Vec<String>,
    examples: Vec<LabeledExample>,
    metadata: DatasetMetadata,
}

impl Dataset {
    /// Build a dataset from examples known to share `schema`
    pub fn new(schema: Vec<String>, examples: Vec<LabeledExample>, metadata: DatasetMetadata) -> Self {
        debug_assert!(examples
            .iter()
            .all(|ex| ex.features.len() == schema.len()));
        Self {
            schema,
            examples,
            metadata,
        }
    }

    /// Feature names, in vector order
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Count of positive (repaid) labels
    pub fn positives(&self) -> usize {
        self.examples.iter().filter(|ex| ex.label).count()
    }

    /// Count of negative labels
    pub fn negatives(&self) -> usize {
        self.len() - self.positives()
    }

    /// One example's features as a dense row in schema order
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.schema
            .iter()
            .map(|name| *self.examples[index].features.get(name).unwrap_or(&f64::NAN))
            .collect()
    }

    /// All feature rows in schema order
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.len()).map(|i| self.row(i)).collect()
    }

    /// Derive a new dataset keeping the rows at `indices`, preserving order
    pub(crate) fn subset(&self, indices: &[usize], metadata: DatasetMetadata) -> Self {
        let examples = indices
            .iter()
            .map(|&i| self.examples[i].clone())
            .collect();
        Self::new(self.schema.clone(), examples, metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(value: f64, label: bool) -> LabeledExample {
        let mut features = FeatureVector::new();
        features.insert("x".to_string(), value);
        LabeledExample { features, label }
    }

    fn dataset(values: &[(f64, bool)]) -> Dataset {
        let examples: Vec<_> = values.iter().map(|&(v, l)| example(v, l)).collect();
        let meta = DatasetMetadata::new(values.len(), values.len());
        Dataset::new(vec!["x".to_string()], examples, meta)
    }

    #[test]
    fn test_label_counts() {
        let ds = dataset(&[(1.0, true), (2.0, false), (3.0, true)]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.positives(), 2);
        assert_eq!(ds.negatives(), 1);
    }

    #[test]
    fn test_rows_schema_order() {
        let ds = dataset(&[(1.5, true), (2.5, false)]);
        assert_eq!(ds.rows(), vec![vec![1.5], vec![2.5]]);
    }

    #[test]
    fn test_subset_preserves_order() {
        let ds = dataset(&[(1.0, true), (2.0, false), (3.0, true), (4.0, false)]);
        let meta = DatasetMetadata::new(2, 2);
        let sub = ds.subset(&[3, 1], meta);
        assert_eq!(sub.rows(), vec![vec![4.0], vec![2.0]]);
        assert_eq!(sub.schema(), ds.schema());
    }

    #[test]
    fn test_metadata_success_ratio() {
        let meta = DatasetMetadata::new(10, 8);
        assert!((meta.success_ratio - 0.8).abs() < 1e-12);
        let empty = DatasetMetadata::new(0, 0);
        assert_eq!(empty.success_ratio, 1.0);
    }

    #[test]
    fn test_cleaning_ratio() {
        let summary = CleaningSummary {
            input_rows: 100,
            kept_rows: 90,
            ..CleaningSummary::default()
        };
        assert!((summary.cleaning_ratio() - 0.9).abs() < 1e-12);
        assert_eq!(CleaningSummary::default().cleaning_ratio(), 1.0);
    }
}
