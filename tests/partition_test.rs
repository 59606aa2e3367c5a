//! Dataset Partitioner Tests
//!
//! Loading, label separation and the fixed 30% / seed 42 holdout split.

mod common;

use std::collections::HashSet;
use tempfile::TempDir;
use wine_quality::data::{
    f64_column, partition, Dataset, DEFAULT_SEED, DEFAULT_TEST_FRACTION, LABEL_COLUMN,
};
use wine_quality::Error;

// =============================================================================
// Split Shape Tests
// =============================================================================

#[test]
fn test_thousand_rows_split_300_700() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 1000, 1);

    let split = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap();

    assert_eq!(split.x_test.num_rows(), 300);
    assert_eq!(split.y_test.num_rows(), 300);
    assert_eq!(split.x_train.num_rows(), 700);
    assert_eq!(split.y_train.num_rows(), 700);

    let train: HashSet<u32> = split.train_rows().iter().copied().collect();
    let test: HashSet<u32> = split.test_rows().iter().copied().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), 1000);
    assert_eq!(train.union(&test).count(), 1000);
}

#[test]
fn test_features_exclude_label() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 50, 2);

    let split = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap();

    let features: Vec<String> = split
        .x_train
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(features, common::FEATURES);
    assert_eq!(split.y_train.num_columns(), 1);
    assert_eq!(split.y_train.schema().field(0).name(), LABEL_COLUMN);
}

#[test]
fn test_odd_size_rounds_holdout_up() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 11, 3);

    let split = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap();

    // ceil(11 * 0.3) = 4
    assert_eq!(split.x_test.num_rows(), 4);
    assert_eq!(split.x_train.num_rows(), 7);
}

#[test]
fn test_rows_follow_source_indices() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 40, 4);
    let dataset = Dataset::from_csv(&path).unwrap();
    let label_idx = dataset.label_index(LABEL_COLUMN).unwrap();
    let labels = f64_column(dataset.batch(), label_idx).unwrap();

    let split = dataset
        .partition(LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED)
        .unwrap();

    let y_test = f64_column(&split.y_test, 0).unwrap();
    for (pos, &row) in split.test_rows().iter().enumerate() {
        assert!((y_test[pos] - labels[row as usize]).abs() < f64::EPSILON);
    }
}

// =============================================================================
// Determinism Tests
// =============================================================================

#[test]
fn test_same_seed_same_partition() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 200, 5);

    let a = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap();
    let b = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap();

    assert_eq!(a.train_rows(), b.train_rows());
    assert_eq!(a.test_rows(), b.test_rows());
    assert_eq!(a.x_test, b.x_test);
}

#[test]
fn test_different_seed_different_partition() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 200, 6);

    let a = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, 42).unwrap();
    let b = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, 7).unwrap();

    assert_ne!(a.test_rows(), b.test_rows());
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_missing_file_is_data_load_error() {
    let dir = TempDir::new().unwrap();
    let err = partition(
        dir.path().join("absent.csv"),
        LABEL_COLUMN,
        DEFAULT_TEST_FRACTION,
        DEFAULT_SEED,
    )
    .unwrap_err();
    assert!(matches!(err, Error::DataLoad(_)));
}

#[test]
fn test_missing_label_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 20, 7);

    let err = partition(&path, "rating", DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap_err();
    match err {
        Error::Schema { column, available } => {
            assert_eq!(column, "rating");
            assert!(available.contains("quality"));
        }
        other => panic!("expected schema error, got {other:?}"),
    }
}

#[test]
fn test_non_numeric_cell_is_data_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "alcohol,quality\n9.5,5\nstrong,6\n").unwrap();

    let err = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap_err();
    assert!(matches!(err, Error::DataLoad(_)));
}

#[test]
fn test_header_only_is_data_load_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.csv");
    std::fs::write(&path, "alcohol,quality\n").unwrap();

    let err = partition(&path, LABEL_COLUMN, DEFAULT_TEST_FRACTION, DEFAULT_SEED).unwrap_err();
    assert!(matches!(err, Error::DataLoad(_)));
}

#[test]
fn test_fraction_out_of_range_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = common::write_wine_csv(dir.path(), 20, 8);

    for fraction in [0.0, 1.0, -0.2, 1.5] {
        let err = partition(&path, LABEL_COLUMN, fraction, DEFAULT_SEED).unwrap_err();
        assert!(matches!(err, Error::Config(_)), "fraction {fraction}");
    }
}
