//! Stage composition shared by the CLI and integration tests

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::frequency::Frequency;
use crate::metrics::{evaluate_forecast, Metrics};
use crate::models::{FittedForecaster, ForecastResult, Forecaster, SeasonalityMode};
use crate::split::split_train_test;
use tracing::info;

/// Fit on all but the last `test_periods` rows and score the prediction of those rows
pub fn holdout_evaluation<F: Forecaster>(
    forecaster: &F,
    series: &TimeSeries,
    test_periods: usize,
    mode: SeasonalityMode,
    frequency: Frequency,
) -> Result<Metrics> {
    let (train, test) = split_train_test(series, test_periods)?;
    info!(
        model = forecaster.name(),
        train = train.len(),
        test = test.len(),
        "running holdout evaluation"
    );

    let model = forecaster.fit(&train, mode)?;
    let forecast = model.predict(test.len(), frequency)?;
    check_coverage(&model, &forecast, test.len())?;
    evaluate_forecast(&test, &forecast)
}

/// Fit on the whole series and predict `horizon` steps past its end
pub fn forecast_series<F: Forecaster>(
    forecaster: &F,
    series: &TimeSeries,
    horizon: usize,
    mode: SeasonalityMode,
    frequency: Frequency,
) -> Result<ForecastResult> {
    info!(
        model = forecaster.name(),
        rows = series.len(),
        horizon,
        "fitting final model"
    );

    let model = forecaster.fit(series, mode)?;
    let forecast = model.predict(horizon, frequency)?;
    check_coverage(&model, &forecast, horizon)?;
    Ok(forecast)
}

/// A prediction must cover the fitted history and exactly `horizon` steps past it
fn check_coverage<M: FittedForecaster>(
    model: &M,
    forecast: &ForecastResult,
    horizon: usize,
) -> Result<()> {
    let history = model.history();
    let covers_history = forecast.history_len() == history.len()
        && forecast.points()[..forecast.history_len()]
            .iter()
            .zip(history.observations())
            .all(|(point, observation)| point.timestamp == observation.timestamp);

    if !covers_history || forecast.future_points().len() != horizon {
        return Err(ForecastError::ModelError(format!(
            "Forecast has {} points ({} in-sample), expected {} in-sample plus {} ahead",
            forecast.len(),
            forecast.history_len(),
            history.len(),
            horizon
        )));
    }
    Ok(())
}
