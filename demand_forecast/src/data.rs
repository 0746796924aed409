//! Time series data handling for demand forecasting

use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Canonical name of the date axis
pub const DATE_COLUMN: &str = "ds";
/// Canonical name of the value axis
pub const VALUE_COLUMN: &str = "y";

/// Fallback names tried after the preferred date column
const DATE_FALLBACKS: [&str; 3] = ["ds", "date", "timestamp"];
/// Fallback names tried after the preferred value column
const VALUE_FALLBACKS: [&str; 5] = ["y", "demand", "value", "qty", "quantity"];

/// Accepted layouts for date cells without an explicit offset
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// A single timestamped demand value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Time of the observation
    pub timestamp: NaiveDateTime,
    /// Observed demand
    pub value: f64,
}

impl Observation {
    /// Create a new observation
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Canonical demand series: non-empty, strictly increasing timestamps, finite values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Create a series, validating the ordering and value invariants
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(ForecastError::DataQualityError(
                "Time series must contain at least one row".to_string(),
            ));
        }

        if let Some(bad) = observations.iter().find(|o| !o.value.is_finite()) {
            return Err(ForecastError::DataQualityError(format!(
                "Non-finite value {} at {}",
                bad.value, bad.timestamp
            )));
        }

        if let Some(pair) = observations
            .windows(2)
            .find(|w| w[0].timestamp >= w[1].timestamp)
        {
            return Err(ForecastError::DataQualityError(format!(
                "Timestamps must be strictly increasing: {} is followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }

        Ok(Self { observations })
    }

    /// Create a series from parallel timestamp and value vectors
    pub fn from_parts(timestamps: Vec<NaiveDateTime>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(ForecastError::DataQualityError(format!(
                "Timestamps length ({}) doesn't match values length ({})",
                timestamps.len(),
                values.len()
            )));
        }

        Self::new(
            timestamps
                .into_iter()
                .zip(values)
                .map(|(timestamp, value)| Observation { timestamp, value })
                .collect(),
        )
    }

    /// All observations in time order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Get the timestamps as a vector
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.observations.iter().map(|o| o.timestamp).collect()
    }

    /// Get the values as a vector
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// First observation
    pub fn first(&self) -> &Observation {
        &self.observations[0]
    }

    /// Last observation
    pub fn last(&self) -> &Observation {
        &self.observations[self.observations.len() - 1]
    }

    /// Get the length of the time series
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Always false: a series holds at least one row
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Get a copy of the rows in `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start >= end || end > self.len() {
            return Err(ForecastError::DataQualityError(format!(
                "Invalid slice {}..{} of a series with {} rows",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            observations: self.observations[start..end].to_vec(),
        })
    }
}

/// Loader turning arbitrary tabular data into a canonical [`TimeSeries`]
#[derive(Debug, Clone)]
pub struct SeriesLoader {
    date_candidates: Vec<String>,
    value_candidates: Vec<String>,
}

impl Default for SeriesLoader {
    fn default() -> Self {
        Self::new(DATE_COLUMN, VALUE_COLUMN)
    }
}

impl SeriesLoader {
    /// Create a loader preferring the given column names, then the built-in fallbacks
    pub fn new(date_col: &str, value_col: &str) -> Self {
        Self {
            date_candidates: candidates(date_col, &DATE_FALLBACKS),
            value_candidates: candidates(value_col, &VALUE_FALLBACKS),
        }
    }

    /// Load a time series from a CSV file
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<TimeSeries> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading demand table");

        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        self.load_dataframe(&df)
    }

    /// Create a time series from an existing DataFrame
    pub fn load_dataframe(&self, df: &DataFrame) -> Result<TimeSeries> {
        let column_names = df.get_column_names();
        let date_column = resolve_column("date", &self.date_candidates, &column_names)?;
        let value_column = resolve_column("value", &self.value_candidates, &column_names)?;
        debug!(date_column, value_column, "resolved series columns");

        let dates = df.column(date_column)?.cast(&DataType::Utf8)?;
        let values = df.column(value_column)?.cast(&DataType::Utf8)?;

        let mut observations: Vec<Observation> = dates
            .utf8()?
            .into_iter()
            .zip(values.utf8()?.into_iter())
            .filter_map(|(date, value)| {
                Some(Observation {
                    timestamp: parse_timestamp(date?)?,
                    value: parse_value(value?)?,
                })
            })
            .collect();

        let dropped = df.height() - observations.len();
        if dropped > 0 {
            warn!(dropped, "dropped rows with unparseable date or value");
        }

        observations.sort_by_key(|o| o.timestamp);
        let before_dedup = observations.len();
        observations.dedup_by_key(|o| o.timestamp);
        let duplicates = before_dedup - observations.len();
        if duplicates > 0 {
            warn!(duplicates, "dropped rows with duplicate timestamps");
        }

        if observations.is_empty() {
            return Err(ForecastError::DataQualityError(format!(
                "No valid rows remain after cleaning {} input rows",
                df.height()
            )));
        }

        info!(rows = observations.len(), "loaded demand series");
        TimeSeries::new(observations)
    }
}

/// Preferred name first, then fallbacks, without repeats
fn candidates(preferred: &str, fallbacks: &[&str]) -> Vec<String> {
    let mut names = vec![preferred.to_string()];
    for name in fallbacks {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn resolve_column<'a>(
    axis: &'static str,
    candidates: &[String],
    column_names: &[&'a str],
) -> Result<&'a str> {
    candidates
        .iter()
        .find_map(|candidate| column_names.iter().find(|c| **c == candidate.as_str()))
        .copied()
        .ok_or_else(|| ForecastError::SchemaError {
            axis,
            expected: candidates.join(", "),
            found: column_names.join(", "),
        })
}

/// Parse a date cell; `None` marks the row as invalid
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a value cell; non-finite numbers are treated as missing
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
