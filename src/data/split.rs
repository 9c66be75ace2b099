//! Train/validation splitting
//!
//! A plain uniform shuffle, not stratified by label: rare outcome classes can
//! land unevenly in the validation set, destabilizing precision/recall/AUC
//! estimates. Callers wanting class balance must pre-stratify; this is a
//! known, documented limitation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::dataset::{Dataset, DatasetMetadata};
use super::{DataError, Result};

/// Partition a cleaned dataset into disjoint (train, validation) subsets.
///
/// `|validation| = floor(n * validation_fraction)`; every row lands in
/// exactly one side. The shuffle is seeded when `seed` is given, otherwise
/// drawn from entropy.
pub fn split(
    dataset: &Dataset,
    validation_fraction: f64,
    seed: Option<u64>,
) -> Result<(Dataset, Dataset)> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        return Err(DataError::InvalidSplitFraction(validation_fraction));
    }
    if dataset.is_empty() {
        return Err(DataError::EmptyDataset);
    }

    let n = dataset.len();
    let validation_size = (n as f64 * validation_fraction).floor() as usize;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let (validation_idx, train_idx) = indices.split_at(validation_size);

    let meta = dataset.metadata().clone();
    let train = dataset.subset(train_idx, meta.clone());
    let validation = dataset.subset(validation_idx, meta);
    Ok((train, validation))
}
