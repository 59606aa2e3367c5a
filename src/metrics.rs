//! Regression metrics comparing holdout predictions to true labels

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Metric set logged for every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination (may be negative)
    pub r2: f64,
}

impl RegressionMetrics {
    /// `(name, value)` pairs in logging order.
    #[must_use]
    pub const fn named(&self) -> [(&'static str, f64); 3] {
        [("rmse", self.rmse), ("r2", self.r2), ("mae", self.mae)]
    }
}

/// Compute RMSE, MAE and R² for equal-length, non-empty inputs.
///
/// When `y_true` is constant, R² is 1.0 for a perfect prediction and 0.0
/// otherwise.
///
/// # Errors
///
/// Returns [`Error::Metric`] if the inputs are empty or differ in length.
pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> Result<RegressionMetrics> {
    if y_true.is_empty() {
        return Err(Error::Metric("cannot evaluate an empty holdout set".to_string()));
    }
    if y_true.len() != y_pred.len() {
        return Err(Error::Metric(format!(
            "length mismatch: {} labels vs {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }

    #[allow(clippy::cast_precision_loss)]
    let n = y_true.len() as f64;
    let mse = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (p - t).powi(2))
        .sum::<f64>()
        / n;
    let mae = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (p - t).abs())
        .sum::<f64>()
        / n;

    let mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res = mse * n;
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    };

    Ok(RegressionMetrics {
        rmse: mse.sqrt(),
        mae,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let m = evaluate(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(m.rmse.abs() < f64::EPSILON);
        assert!(m.mae.abs() < f64::EPSILON);
        assert!((m.r2 - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_known_values() {
        let m = evaluate(&[3.0, 5.0], &[4.0, 7.0]).unwrap();
        assert!((m.rmse - 2.5_f64.sqrt()).abs() < 1e-12);
        assert!((m.mae - 1.5).abs() < 1e-12);
        // ss_res = 5, ss_tot = 2
        assert!((m.r2 - (1.0 - 5.0 / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_negative_r2_allowed() {
        let m = evaluate(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!(m.r2 < 0.0);
    }

    #[test]
    fn test_constant_truth() {
        assert!((evaluate(&[2.0, 2.0], &[2.0, 2.0]).unwrap().r2 - 1.0).abs() < f64::EPSILON);
        assert!(evaluate(&[2.0, 2.0], &[1.0, 2.0]).unwrap().r2.abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_and_mismatched() {
        assert!(matches!(evaluate(&[], &[]), Err(Error::Metric(_))));
        assert!(matches!(evaluate(&[1.0], &[1.0, 2.0]), Err(Error::Metric(_))));
    }
}
