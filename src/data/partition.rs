//! Seeded train/test partitioning

use super::Dataset;
use crate::{Error, Result};
use arrow::array::UInt32Array;
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

/// Default holdout proportion.
pub const DEFAULT_TEST_FRACTION: f64 = 0.30;

/// Default permutation seed.
pub const DEFAULT_SEED: u64 = 42;

/// Row-disjoint train/test partition with the label separated from the
/// features.
///
/// `x_*` batches hold every column except the label; `y_*` batches hold the
/// label column alone.
#[derive(Debug, Clone)]
pub struct Split {
    /// Training features
    pub x_train: RecordBatch,
    /// Holdout features
    pub x_test: RecordBatch,
    /// Training labels (single column)
    pub y_train: RecordBatch,
    /// Holdout labels (single column)
    pub y_test: RecordBatch,
    train_rows: Vec<u32>,
    test_rows: Vec<u32>,
}

impl Split {
    /// Source row indices (0-based, data rows only) of the training set, in
    /// partition order.
    #[must_use]
    pub fn train_rows(&self) -> &[u32] {
        &self.train_rows
    }

    /// Source row indices of the holdout set, in partition order.
    #[must_use]
    pub fn test_rows(&self) -> &[u32] {
        &self.test_rows
    }
}

/// Load `path` and partition it.
///
/// # Errors
///
/// Returns [`Error::DataLoad`] if the file cannot be loaded and
/// [`Error::Schema`] if `label_column` is absent.
pub fn partition<P: AsRef<Path>>(
    path: P,
    label_column: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<Split> {
    Dataset::from_csv(path)?.partition(label_column, test_fraction, seed)
}

impl Dataset {
    /// Split rows into train and test sets.
    ///
    /// The holdout receives `ceil(n * test_fraction)` rows. Rows are permuted
    /// with a `StdRng` seeded from `seed`; the first rows of the permutation
    /// form the holdout, so identical input and seed always give identical
    /// partitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `test_fraction` is not in `(0, 1)` and
    /// [`Error::Schema`] if `label_column` is absent.
    pub fn partition(&self, label_column: &str, test_fraction: f64, seed: u64) -> Result<Split> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(Error::Config(format!(
                "test_fraction must be in (0, 1), got {test_fraction}"
            )));
        }
        let label_idx = self.label_index(label_column)?;

        let n = self.num_rows();
        let n_rows = u32::try_from(n)
            .map_err(|_| Error::DataLoad(format!("dataset too large to partition: {n} rows")))?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let n_test = ((n as f64) * test_fraction).ceil() as usize;

        let mut rows: Vec<u32> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        rows.shuffle(&mut rng);
        let train_rows = rows.split_off(n_test.min(n));
        let test_rows = rows;

        let feature_idx: Vec<usize> = (0..self.batch().num_columns())
            .filter(|&i| i != label_idx)
            .collect();

        let train = take_record_batch(self.batch(), &UInt32Array::from(train_rows.clone()))?;
        let test = take_record_batch(self.batch(), &UInt32Array::from(test_rows.clone()))?;

        tracing::debug!(
            rows = n,
            train = train.num_rows(),
            test = test.num_rows(),
            features = feature_idx.len(),
            seed,
            "partitioned dataset"
        );

        Ok(Split {
            x_train: train.project(&feature_idx)?,
            x_test: test.project(&feature_idx)?,
            y_train: train.project(&[label_idx])?,
            y_test: test.project(&[label_idx])?,
            train_rows,
            test_rows,
        })
    }
}
