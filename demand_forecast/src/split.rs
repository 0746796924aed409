//! Train/holdout splitting

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};

/// Split a series into training rows and the trailing `test_periods` holdout rows
pub fn split_train_test(
    series: &TimeSeries,
    test_periods: usize,
) -> Result<(TimeSeries, TimeSeries)> {
    if test_periods == 0 {
        return Err(ForecastError::ConfigurationError(
            "test_periods must be greater than 0".to_string(),
        ));
    }
    if test_periods >= series.len() {
        return Err(ForecastError::ConfigurationError(format!(
            "test_periods ({}) must be smaller than the dataset length ({})",
            test_periods,
            series.len()
        )));
    }

    let cut = series.len() - test_periods;
    let train = series.slice(0, cut)?;
    let test = series.slice(cut, series.len())?;

    Ok((train, test))
}
