//! Property-based tests for wine-quality
//!
//! - Partition determinism, disjointness and coverage
//! - Exact metric formulas
//! - Tree leaf bound
//! - Run with ProptestConfig::with_cases(100)

use arrow::array::{ArrayRef, Float64Array};
use arrow::record_batch::RecordBatch;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use wine_quality::data::{Dataset, DEFAULT_TEST_FRACTION, LABEL_COLUMN};
use wine_quality::metrics::evaluate;
use wine_quality::model::{fit, predict, TreeParams};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate a dataset with two features and a `quality` label
fn arb_dataset(max_rows: usize) -> impl Strategy<Value = Dataset> {
    (2..=max_rows)
        .prop_flat_map(|rows| {
            (
                proptest::collection::vec(0.0f64..15.0, rows),
                proptest::collection::vec(0.0f64..1.5, rows),
                proptest::collection::vec(3i32..=9, rows),
            )
        })
        .prop_map(|(alcohol, acidity, quality)| {
            let batch = RecordBatch::try_from_iter(vec![
                ("alcohol", Arc::new(Float64Array::from(alcohol)) as ArrayRef),
                ("volatile_acidity", Arc::new(Float64Array::from(acidity)) as ArrayRef),
                (
                    LABEL_COLUMN,
                    Arc::new(Float64Array::from(
                        quality.into_iter().map(f64::from).collect::<Vec<_>>(),
                    )) as ArrayRef,
                ),
            ])
            .unwrap();
            Dataset::from_batch(batch).unwrap()
        })
}

/// Generate equal-length prediction/label vectors
fn arb_pairs() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..200).prop_flat_map(|n| {
        (
            proptest::collection::vec(-1e3f64..1e3, n),
            proptest::collection::vec(-1e3f64..1e3, n),
        )
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: identical input and seed give identical partitions
    #[test]
    fn prop_partition_deterministic(dataset in arb_dataset(300), seed in any::<u64>()) {
        let a = dataset.partition(LABEL_COLUMN, DEFAULT_TEST_FRACTION, seed).unwrap();
        let b = dataset.partition(LABEL_COLUMN, DEFAULT_TEST_FRACTION, seed).unwrap();
        prop_assert_eq!(a.train_rows(), b.train_rows());
        prop_assert_eq!(a.test_rows(), b.test_rows());
    }

    /// Property: train and test are disjoint and cover every row
    #[test]
    fn prop_partition_disjoint_and_complete(
        dataset in arb_dataset(300),
        seed in any::<u64>(),
        fraction in 0.05f64..0.95,
    ) {
        let n = dataset.num_rows();
        let split = dataset.partition(LABEL_COLUMN, fraction, seed).unwrap();

        let train: HashSet<u32> = split.train_rows().iter().copied().collect();
        let test: HashSet<u32> = split.test_rows().iter().copied().collect();
        prop_assert!(train.is_disjoint(&test));
        prop_assert_eq!(train.len() + test.len(), n);
        prop_assert!(train.union(&test).all(|&r| (r as usize) < n));

        let expected_test = ((n as f64) * fraction).ceil() as usize;
        prop_assert_eq!(split.x_test.num_rows(), expected_test.min(n));
        prop_assert_eq!(split.x_train.num_rows() + split.x_test.num_rows(), n);
    }

    /// Property: rmse = sqrt(mean((y_pred - y_true)^2)) exactly
    #[test]
    fn prop_rmse_formula_exact((y_true, y_pred) in arb_pairs()) {
        let metrics = evaluate(&y_true, &y_pred).unwrap();
        let n = y_true.len() as f64;
        let expected = (y_true
            .iter()
            .zip(&y_pred)
            .map(|(t, p)| (p - t).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();
        prop_assert_eq!(metrics.rmse, expected);
    }

    /// Property: mae <= rmse and both are non-negative
    #[test]
    fn prop_mae_bounded_by_rmse((y_true, y_pred) in arb_pairs()) {
        let metrics = evaluate(&y_true, &y_pred).unwrap();
        prop_assert!(metrics.mae >= 0.0);
        prop_assert!(metrics.mae <= metrics.rmse + 1e-9);
    }

    /// Property: r2 never exceeds 1
    #[test]
    fn prop_r2_at_most_one((y_true, y_pred) in arb_pairs()) {
        let metrics = evaluate(&y_true, &y_pred).unwrap();
        prop_assert!(metrics.r2 <= 1.0 + 1e-12);
    }

    /// Property: leaf count never exceeds max_leaf_nodes
    #[test]
    fn prop_leaf_bound(dataset in arb_dataset(200), max_leaf_nodes in 1usize..40) {
        let split = dataset.partition(LABEL_COLUMN, DEFAULT_TEST_FRACTION, 42).unwrap();
        prop_assume!(split.x_train.num_rows() > 0);
        let params = TreeParams { max_depth: None, max_leaf_nodes };
        let model = fit(&split.x_train, &split.y_train, &params).unwrap();
        prop_assert!(model.leaf_count() <= max_leaf_nodes);
        prop_assert_eq!(predict(&model, &split.x_test).unwrap().len(), split.x_test.num_rows());
    }
}
