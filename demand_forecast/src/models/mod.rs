//! Forecasting models for demand series
//!
//! A [`Forecaster`] is an untrained configuration; fitting it on a training
//! series yields a [`FittedForecaster`] that predicts over the known history
//! plus a future horizon. The pipeline only ever talks to these two traits.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::frequency::Frequency;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

/// How seasonal effects combine with the trend level
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    /// Seasonal effects are added to the trend
    Additive,
    /// Seasonal effects scale the trend
    #[default]
    Multiplicative,
}

impl FromStr for SeasonalityMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "additive" => Ok(SeasonalityMode::Additive),
            "multiplicative" => Ok(SeasonalityMode::Multiplicative),
            _ => Err(ForecastError::ConfigurationError(format!(
                "Unknown seasonality mode '{}', expected additive or multiplicative",
                s
            ))),
        }
    }
}

impl fmt::Display for SeasonalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonalityMode::Additive => write!(f, "additive"),
            SeasonalityMode::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

/// One row of a forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Time of the prediction
    pub timestamp: NaiveDateTime,
    /// Point estimate
    pub point_estimate: f64,
    /// Lower end of the uncertainty interval
    pub lower_bound: Option<f64>,
    /// Upper end of the uncertainty interval
    pub upper_bound: Option<f64>,
}

impl ForecastPoint {
    /// A point without an uncertainty interval
    pub fn new(timestamp: NaiveDateTime, point_estimate: f64) -> Self {
        Self {
            timestamp,
            point_estimate,
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// A point with an uncertainty interval
    pub fn with_bounds(
        timestamp: NaiveDateTime,
        point_estimate: f64,
        lower: f64,
        upper: f64,
    ) -> Self {
        Self {
            timestamp,
            point_estimate,
            lower_bound: Some(lower),
            upper_bound: Some(upper),
        }
    }

    fn has_bounds(&self) -> bool {
        self.lower_bound.is_some() && self.upper_bound.is_some()
    }

    fn has_no_bounds(&self) -> bool {
        self.lower_bound.is_none() && self.upper_bound.is_none()
    }
}

/// Forecast over the history timeline and any future horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    points: Vec<ForecastPoint>,
    /// Number of leading points that lie on the training timeline
    history_len: usize,
}

impl ForecastResult {
    /// Create a forecast with no in-sample prefix; timestamps must increase
    /// and bounds be all-or-nothing
    pub fn new(points: Vec<ForecastPoint>) -> Result<Self> {
        Self::with_history(points, 0)
    }

    /// Create a forecast whose first `history_len` points are in-sample
    pub fn with_history(points: Vec<ForecastPoint>, history_len: usize) -> Result<Self> {
        if history_len > points.len() {
            return Err(ForecastError::ModelError(format!(
                "Forecast claims {} in-sample points but has {}",
                history_len,
                points.len()
            )));
        }

        if let Some(pair) = points.windows(2).find(|w| w[0].timestamp >= w[1].timestamp) {
            return Err(ForecastError::ModelError(format!(
                "Forecast timestamps must be strictly increasing: {} is followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }

        let all_bounded = points.iter().all(ForecastPoint::has_bounds);
        let all_unbounded = points.iter().all(ForecastPoint::has_no_bounds);
        if !all_bounded && !all_unbounded {
            return Err(ForecastError::ModelError(
                "Forecast bounds must be present on every point or on none".to_string(),
            ));
        }

        Ok(Self {
            points,
            history_len,
        })
    }

    /// All rows in time order
    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Number of leading in-sample points
    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Points past the training timeline
    pub fn future_points(&self) -> &[ForecastPoint] {
        &self.points[self.history_len..]
    }

    /// Whether the forecast has no rows
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether rows carry lower/upper bounds
    pub fn has_bounds(&self) -> bool {
        !self.points.is_empty() && self.points.iter().all(ForecastPoint::has_bounds)
    }

    /// Get the timestamps as a vector
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Get the point estimates as a vector
    pub fn point_estimates(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.point_estimate).collect()
    }

    /// Look up the row for an exact timestamp
    pub fn at(&self, timestamp: NaiveDateTime) -> Option<&ForecastPoint> {
        self.points
            .binary_search_by_key(&timestamp, |p| p.timestamp)
            .ok()
            .map(|idx| &self.points[idx])
    }

    /// Rows strictly after `timestamp`
    pub fn after(&self, timestamp: NaiveDateTime) -> &[ForecastPoint] {
        let start = self.points.partition_point(|p| p.timestamp <= timestamp);
        &self.points[start..]
    }
}

/// Model fitted on a training series
pub trait FittedForecaster: Debug {
    /// Predict over the training timeline extended by `horizon` steps of `frequency`
    fn predict(&self, horizon: usize, frequency: Frequency) -> Result<ForecastResult>;

    /// Series the model was fitted on
    fn history(&self) -> &TimeSeries;
}

/// Forecasting technique that can be fitted on a demand series
pub trait Forecaster: Debug {
    /// The type of fitted model produced
    type Fitted: FittedForecaster;

    /// Fit on `training` with weekly and yearly seasonality combined per `mode`
    fn fit(&self, training: &TimeSeries, mode: SeasonalityMode) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod seasonal;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse_timestamp;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).unwrap()
    }

    #[test]
    fn test_mixed_bounds_rejected() {
        let result = ForecastResult::new(vec![
            ForecastPoint::with_bounds(ts("2024-01-01"), 1.0, 0.5, 1.5),
            ForecastPoint::new(ts("2024-01-02"), 2.0),
        ]);
        assert!(matches!(result, Err(ForecastError::ModelError(_))));
    }

    #[test]
    fn test_unordered_points_rejected() {
        let result = ForecastResult::new(vec![
            ForecastPoint::new(ts("2024-01-02"), 1.0),
            ForecastPoint::new(ts("2024-01-01"), 2.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_and_tail() {
        let forecast = ForecastResult::new(vec![
            ForecastPoint::new(ts("2024-01-01"), 1.0),
            ForecastPoint::new(ts("2024-01-02"), 2.0),
            ForecastPoint::new(ts("2024-01-03"), 3.0),
        ])
        .unwrap();

        assert!(!forecast.has_bounds());
        assert_eq!(forecast.at(ts("2024-01-02")).map(|p| p.point_estimate), Some(2.0));
        assert!(forecast.at(ts("2024-01-05")).is_none());
        assert_eq!(forecast.after(ts("2024-01-01")).len(), 2);
        assert!(forecast.after(ts("2024-01-03")).is_empty());
    }

    #[test]
    fn test_history_len_splits_points() {
        let points = vec![
            ForecastPoint::new(ts("2024-01-01"), 1.0),
            ForecastPoint::new(ts("2024-01-02"), 2.0),
            ForecastPoint::new(ts("2024-01-03"), 3.0),
        ];

        let forecast = ForecastResult::with_history(points.clone(), 2).unwrap();
        assert_eq!(forecast.history_len(), 2);
        assert_eq!(forecast.future_points().len(), 1);
        assert_eq!(forecast.future_points()[0].point_estimate, 3.0);

        let unsplit = ForecastResult::new(points.clone()).unwrap();
        assert_eq!(unsplit.history_len(), 0);
        assert_eq!(unsplit.future_points().len(), 3);

        let result = ForecastResult::with_history(points, 4);
        assert!(matches!(result, Err(ForecastError::ModelError(_))));
    }

    #[test]
    fn test_seasonality_mode_parse() {
        assert_eq!(
            "Additive".parse::<SeasonalityMode>().unwrap(),
            SeasonalityMode::Additive
        );
        assert_eq!(SeasonalityMode::default(), SeasonalityMode::Multiplicative);
        assert!("linear".parse::<SeasonalityMode>().is_err());
    }
}
