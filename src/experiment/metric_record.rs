//! Metric Record - one point in a run's metric history

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A logged metric value.
///
/// `step` is the number of earlier points with the same run and key, so
/// a key's history is ordered by step and its current value is the point
/// nothing else supersedes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    run_id: String,
    key: String,
    step: u64,
    value: f64,
    timestamp_ms: i64,
}

impl MetricRecord {
    /// Point for `key` at `step`, stamped with the wall clock in epoch millis.
    #[must_use]
    pub fn new(run_id: impl Into<String>, key: impl Into<String>, step: u64, value: f64) -> Self {
        Self {
            run_id: run_id.into(),
            key: key.into(),
            step,
            value,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Owning run.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Metric name, e.g. `rmse`.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Position in the series, from 0.
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Logged value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Epoch milliseconds at which the point was logged.
    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// True when this point is part of the `(run_id, key)` series.
    #[must_use]
    pub fn belongs_to(&self, run_id: &str, key: &str) -> bool {
        self.run_id == run_id && self.key == key
    }

    /// True when `other` is an older point of the same series.
    ///
    /// Points of different series never supersede one another, and two
    /// points at the same step do not supersede each other either.
    #[must_use]
    pub fn supersedes(&self, other: &Self) -> bool {
        other.belongs_to(&self.run_id, &self.key) && self.step > other.step
    }
}
