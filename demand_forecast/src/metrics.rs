//! Metrics for evaluating forecast accuracy on a holdout window

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::models::ForecastResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Floor on |actual| in the percentage error denominator
pub const MAPE_EPSILON: f64 = 1e-8;

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error, in percent
    pub mape: f64,
    /// Number of actual/forecast pairs the metrics were computed on
    pub points: usize,
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Holdout MAE: {:.2}", self.mae)?;
        write!(f, "Holdout MAPE: {:.2}%", self.mape)
    }
}

/// Evaluate a forecast against holdout actuals, joined on timestamp.
///
/// Actual rows without a forecast row at the same timestamp are left out of
/// both metrics and reported in the log. Fails when no row can be aligned.
pub fn evaluate_forecast(actuals: &TimeSeries, forecast: &ForecastResult) -> Result<Metrics> {
    let pairs: Vec<(f64, f64)> = actuals
        .observations()
        .iter()
        .filter_map(|o| forecast.at(o.timestamp).map(|p| (o.value, p.point_estimate)))
        .collect();

    let unmatched = actuals.len() - pairs.len();
    if unmatched > 0 {
        warn!(
            unmatched,
            total = actuals.len(),
            "holdout rows without a forecast at the same timestamp were excluded"
        );
    }

    let actual: Vec<f64> = pairs.iter().map(|(a, _)| *a).collect();
    let predicted: Vec<f64> = pairs.iter().map(|(_, p)| *p).collect();

    let mae = mean_absolute_error(&actual, &predicted)?;
    let mape = mean_absolute_percentage_error(&actual, &predicted)?;
    if !mae.is_finite() || !mape.is_finite() {
        return Err(ForecastError::EvaluationError(format!(
            "Metrics are not finite (MAE {}, MAPE {})",
            mae, mape
        )));
    }

    debug!(mae, mape, points = pairs.len(), "evaluated forecast");
    Ok(Metrics {
        mae,
        mape,
        points: pairs.len(),
    })
}

/// Mean of |actual - predicted|
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_aligned(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();

    Ok(sum / actual.len() as f64)
}

/// Mean of |actual - predicted| / max(|actual|, 1e-8), times 100
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    check_aligned(actual, predicted)?;

    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs().max(MAPE_EPSILON))
        .sum();

    Ok(sum / actual.len() as f64 * 100.0)
}

fn check_aligned(actual: &[f64], predicted: &[f64]) -> Result<()> {
    if actual.is_empty() {
        return Err(ForecastError::EvaluationError(
            "No aligned actual/forecast rows to evaluate".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::EvaluationError(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }
    Ok(())
}
