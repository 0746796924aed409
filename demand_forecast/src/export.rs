//! Flat-file output of series, forecasts and metrics

use crate::data::{parse_timestamp, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::metrics::Metrics;
use crate::models::{ForecastPoint, ForecastResult};
use chrono::{NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::info;

/// Timestamp column of every exported table
pub const TIMESTAMP_COLUMN: &str = "timestamp";
/// Value column of an exported series
pub const SERIES_VALUE_COLUMN: &str = "value";
/// Point estimate column of an exported forecast
pub const POINT_COLUMN: &str = "point_estimate";
/// Lower bound column of an exported forecast
pub const LOWER_COLUMN: &str = "lower_bound";
/// Upper bound column of an exported forecast
pub const UPPER_COLUMN: &str = "upper_bound";

/// Write a series as `timestamp,value`
pub fn save_series<P: AsRef<Path>>(series: &TimeSeries, path: P) -> Result<()> {
    let mut df = DataFrame::new(vec![
        Series::new(TIMESTAMP_COLUMN, format_timestamps(&series.timestamps())),
        Series::new(SERIES_VALUE_COLUMN, series.values()),
    ])?;

    write_csv(&mut df, path.as_ref())?;
    info!(rows = series.len(), path = %path.as_ref().display(), "saved series");
    Ok(())
}

/// Write a forecast as `timestamp,point_estimate[,lower_bound,upper_bound]`.
///
/// Bound columns are only written when the forecast carries bounds.
pub fn save_forecast<P: AsRef<Path>>(forecast: &ForecastResult, path: P) -> Result<()> {
    let points = forecast.points();
    let mut columns = vec![
        Series::new(TIMESTAMP_COLUMN, format_timestamps(&forecast.timestamps())),
        Series::new(POINT_COLUMN, forecast.point_estimates()),
    ];
    if forecast.has_bounds() {
        columns.push(Series::new(
            LOWER_COLUMN,
            points.iter().map(|p| p.lower_bound).collect::<Vec<_>>(),
        ));
        columns.push(Series::new(
            UPPER_COLUMN,
            points.iter().map(|p| p.upper_bound).collect::<Vec<_>>(),
        ));
    }

    let mut df = DataFrame::new(columns)?;
    write_csv(&mut df, path.as_ref())?;
    info!(rows = forecast.len(), path = %path.as_ref().display(), "saved forecast");
    Ok(())
}

/// Read a forecast written by [`save_forecast`]
pub fn read_forecast<P: AsRef<Path>>(path: P) -> Result<ForecastResult> {
    let file = File::open(path.as_ref())?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;

    let raw_timestamps = df.column(TIMESTAMP_COLUMN)?.cast(&DataType::Utf8)?;
    let timestamps = raw_timestamps
        .utf8()?
        .into_iter()
        .map(|raw| {
            raw.and_then(parse_timestamp).ok_or_else(|| {
                ForecastError::DataQualityError(format!("Invalid forecast timestamp: {:?}", raw))
            })
        })
        .collect::<Result<Vec<NaiveDateTime>>>()?;

    let estimates = float_column(&df, POINT_COLUMN)?;
    let names = df.get_column_names();
    let bounds = if names.contains(&LOWER_COLUMN) && names.contains(&UPPER_COLUMN) {
        Some((float_column(&df, LOWER_COLUMN)?, float_column(&df, UPPER_COLUMN)?))
    } else {
        None
    };

    let points = timestamps
        .into_iter()
        .zip(estimates)
        .enumerate()
        .map(|(i, (ts, estimate))| match &bounds {
            Some((lower, upper)) => ForecastPoint::with_bounds(ts, estimate, lower[i], upper[i]),
            None => ForecastPoint::new(ts, estimate),
        })
        .collect();

    ForecastResult::new(points)
}

/// Write metrics as pretty-printed JSON
pub fn save_metrics<P: AsRef<Path>>(metrics: &Metrics, path: P) -> Result<()> {
    let path = path.as_ref();
    create_parent_dirs(path)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, metrics)?;
    info!(path = %path.display(), "saved metrics");
    Ok(())
}

/// Create the directories leading up to `path`
pub fn create_parent_dirs(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

/// Render timestamps as dates when every one of them is at midnight
pub fn format_timestamps(timestamps: &[NaiveDateTime]) -> Vec<String> {
    let date_only = timestamps.iter().all(|ts| ts.time() == NaiveTime::MIN);
    let fmt = if date_only {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };
    timestamps
        .iter()
        .map(|ts| ts.format(fmt).to_string())
        .collect()
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    create_parent_dirs(path)?;
    let file = File::create(path)?;
    CsvWriter::new(file).has_header(true).finish(df)?;
    Ok(())
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                ForecastError::DataQualityError(format!("Missing value in column '{}'", name))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_timestamps() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let midnight = day.and_hms_opt(0, 0, 0).unwrap();
        let afternoon = day.and_hms_opt(15, 30, 0).unwrap();

        assert_eq!(format_timestamps(&[midnight]), vec!["2024-05-01"]);
        assert_eq!(
            format_timestamps(&[midnight, afternoon]),
            vec!["2024-05-01 00:00:00", "2024-05-01 15:30:00"]
        );
    }

    #[test]
    fn test_parent_dirs_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/metrics.json");
        let metrics = Metrics {
            mae: 1.5,
            mape: 3.0,
            points: 4,
        };

        save_metrics(&metrics, &path).unwrap();
        let restored: Metrics =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored, metrics);
    }
}
