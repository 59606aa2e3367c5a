//! Shared fixtures: synthetic wine-like CSV datasets

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// The eleven physicochemical feature columns of the wine-quality data.
pub const FEATURES: [&str; 11] = [
    "fixed_acidity",
    "volatile_acidity",
    "citric_acid",
    "residual_sugar",
    "chlorides",
    "free_sulfur_dioxide",
    "total_sulfur_dioxide",
    "density",
    "pH",
    "sulphates",
    "alcohol",
];

/// CSV text with `rows` rows of the feature columns plus an integer
/// `quality` label loosely driven by alcohol and volatile acidity.
pub fn wine_csv(rows: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut csv = FEATURES.join(",");
    csv.push_str(",quality\n");
    for _ in 0..rows {
        let values: Vec<f64> = [
            (4.0, 15.0),
            (0.1, 1.5),
            (0.0, 1.0),
            (0.5, 20.0),
            (0.01, 0.3),
            (1.0, 70.0),
            (6.0, 280.0),
            (0.99, 1.004),
            (2.8, 4.0),
            (0.3, 1.5),
            (8.0, 14.5),
        ]
        .iter()
        .map(|&(lo, hi)| rng.gen_range(lo..hi))
        .collect();
        let quality = (values[10] - 8.0).mul_add(0.6, 3.0 - values[1] * 1.5 + rng.gen_range(-0.5..0.5));
        let quality = quality.round().clamp(3.0, 9.0) as i64;
        let row: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
        let _ = writeln!(csv, "{},{quality}", row.join(","));
    }
    csv
}

/// Write [`wine_csv`] to `dir/wine.csv`.
pub fn write_wine_csv(dir: &Path, rows: usize, seed: u64) -> PathBuf {
    let path = dir.join("wine.csv");
    std::fs::write(&path, wine_csv(rows, seed)).unwrap();
    path
}
