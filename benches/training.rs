//! Tree fitting benchmarks
//!
//! Run with: cargo bench --bench training

use arrow::array::{ArrayRef, Float64Array};
use arrow::record_batch::RecordBatch;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use wine_quality::metrics::evaluate;
use wine_quality::model::{fit, predict, TreeParams};

const FEATURES: usize = 11;

/// Synthetic wine-like training set: 11 features, integer quality label
fn training_set(rows: usize) -> (RecordBatch, RecordBatch) {
    let mut rng = StdRng::seed_from_u64(7);
    let columns: Vec<Vec<f64>> = (0..FEATURES)
        .map(|_| (0..rows).map(|_| rng.gen_range(0.0..10.0)).collect())
        .collect();
    let label: Vec<f64> = (0..rows)
        .map(|r| (3.0 + columns[0][r] * 0.3 + columns[4][r] * 0.2).round())
        .collect();

    let x = RecordBatch::try_from_iter(columns.into_iter().enumerate().map(|(i, c)| {
        (format!("f{i}"), Arc::new(Float64Array::from(c)) as ArrayRef)
    }))
    .unwrap();
    let y = RecordBatch::try_from_iter(vec![(
        "quality",
        Arc::new(Float64Array::from(label)) as ArrayRef,
    )])
    .unwrap();
    (x, y)
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_fit");

    for rows in [700, 3_500] {
        let (x, y) = training_set(rows);
        group.bench_with_input(BenchmarkId::new("leaves_32", rows), &(x, y), |b, (x, y)| {
            b.iter(|| fit(black_box(x), black_box(y), &TreeParams::default()).unwrap());
        });
    }

    let (x, y) = training_set(3_500);
    let params = TreeParams {
        max_depth: Some(4),
        ..TreeParams::default()
    };
    group.bench_function("depth_4/3500", |b| {
        b.iter(|| fit(black_box(&x), black_box(&y), &params).unwrap());
    });

    group.finish();
}

fn bench_predict_evaluate(c: &mut Criterion) {
    let (x, y) = training_set(3_500);
    let model = fit(&x, &y, &TreeParams::default()).unwrap();
    let labels = y
        .column(0)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap()
        .values()
        .to_vec();

    c.bench_function("predict_evaluate/3500", |b| {
        b.iter(|| {
            let predictions = predict(&model, black_box(&x)).unwrap();
            evaluate(&labels, &predictions).unwrap()
        });
    });
}

criterion_group!(benches, bench_fit, bench_predict_evaluate);
criterion_main!(benches);
