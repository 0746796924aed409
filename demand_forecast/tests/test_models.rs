use demand_forecast::models::seasonal::SeasonalTrendForecaster;
use demand_forecast::models::{
    FittedForecaster, ForecastPoint, ForecastResult, Forecaster, SeasonalityMode,
};
use demand_forecast::pipeline::{forecast_series, holdout_evaluation};
use demand_forecast::{
    ForecastError, Frequency, Result, SyntheticSeriesGenerator, SyntheticSpec, TimeSeries,
};
use chrono::NaiveDate;
use rstest::rstest;

/// Forecaster predicting the last training value plus a fixed offset
#[derive(Debug, Clone)]
struct LastValuePlus {
    offset: f64,
}

#[derive(Debug)]
struct FittedLastValuePlus {
    history: TimeSeries,
    level: f64,
}

impl Forecaster for LastValuePlus {
    type Fitted = FittedLastValuePlus;

    fn fit(&self, training: &TimeSeries, _mode: SeasonalityMode) -> Result<FittedLastValuePlus> {
        Ok(FittedLastValuePlus {
            history: training.clone(),
            level: training.last().value + self.offset,
        })
    }

    fn name(&self) -> &str {
        "LastValuePlus"
    }
}

impl FittedForecaster for FittedLastValuePlus {
    fn predict(&self, horizon: usize, frequency: Frequency) -> Result<ForecastResult> {
        let mut points: Vec<ForecastPoint> = self
            .history
            .observations()
            .iter()
            .map(|o| ForecastPoint::new(o.timestamp, o.value))
            .collect();
        for step in 1..=horizon {
            let ts = frequency.advance(self.history.last().timestamp, step)?;
            points.push(ForecastPoint::new(ts, self.level));
        }
        ForecastResult::with_history(points, self.history.len())
    }

    fn history(&self) -> &TimeSeries {
        &self.history
    }
}

/// Forecaster whose predictions leave out the training timeline
#[derive(Debug, Clone)]
struct FutureOnly;

#[derive(Debug)]
struct FittedFutureOnly(FittedLastValuePlus);

impl Forecaster for FutureOnly {
    type Fitted = FittedFutureOnly;

    fn fit(&self, training: &TimeSeries, mode: SeasonalityMode) -> Result<FittedFutureOnly> {
        Ok(FittedFutureOnly(
            LastValuePlus { offset: 0.0 }.fit(training, mode)?,
        ))
    }

    fn name(&self) -> &str {
        "FutureOnly"
    }
}

impl FittedForecaster for FittedFutureOnly {
    fn predict(&self, horizon: usize, frequency: Frequency) -> Result<ForecastResult> {
        let full = self.0.predict(horizon, frequency)?;
        ForecastResult::new(full.future_points().to_vec())
    }

    fn history(&self) -> &TimeSeries {
        self.0.history()
    }
}

fn synthetic(periods: usize) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let spec = SyntheticSpec::new(start, periods, Frequency::Daily, 42).unwrap();
    SyntheticSeriesGenerator::new().generate(&spec).unwrap()
}

fn flat_series(len: usize, value: f64, frequency: Frequency) -> TimeSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let stamps = frequency.range(start, len).unwrap();
    TimeSeries::from_parts(stamps, vec![value; len]).unwrap()
}

#[test]
fn test_holdout_with_stub_forecaster() {
    let series = flat_series(20, 50.0, Frequency::Daily);
    let stub = LastValuePlus { offset: 5.0 };

    let metrics = holdout_evaluation(
        &stub,
        &series,
        5,
        SeasonalityMode::Additive,
        Frequency::Daily,
    )
    .unwrap();

    assert_eq!(metrics.points, 5);
    assert!((metrics.mae - 5.0).abs() < 1e-12);
    assert!((metrics.mape - 10.0).abs() < 1e-9);
}

#[test]
fn test_holdout_frequency_mismatch_fails() {
    // Weekly data predicted at a daily step shares no holdout timestamps
    let series = flat_series(20, 50.0, Frequency::Weekly);
    let stub = LastValuePlus { offset: 0.0 };

    let result = holdout_evaluation(
        &stub,
        &series,
        1,
        SeasonalityMode::Additive,
        Frequency::Daily,
    );

    assert!(matches!(result, Err(ForecastError::EvaluationError(_))));
}

#[test]
fn test_forecast_series_covers_history_and_horizon() {
    let series = flat_series(10, 3.0, Frequency::Daily);
    let forecast = forecast_series(
        &LastValuePlus { offset: 1.0 },
        &series,
        4,
        SeasonalityMode::Multiplicative,
        Frequency::Daily,
    )
    .unwrap();

    assert_eq!(forecast.len(), 14);
    assert_eq!(forecast.after(series.last().timestamp).len(), 4);
    assert!(forecast
        .after(series.last().timestamp)
        .iter()
        .all(|p| p.point_estimate == 4.0));
}

#[rstest]
#[case(SeasonalityMode::Additive, 400)]
#[case(SeasonalityMode::Multiplicative, 400)]
#[case(SeasonalityMode::Additive, 730)]
#[case(SeasonalityMode::Multiplicative, 730)]
fn test_seasonal_model_on_synthetic_demand(#[case] mode: SeasonalityMode, #[case] periods: usize) {
    let series = synthetic(periods);

    let metrics = holdout_evaluation(
        &SeasonalTrendForecaster::new(),
        &series,
        28,
        mode,
        Frequency::Daily,
    )
    .unwrap();

    assert_eq!(metrics.points, 28);
    // The noise alone has a standard deviation of 6
    assert!(metrics.mae < 10.0, "MAE too large: {}", metrics.mae);
    assert!(metrics.mape < 8.0, "MAPE too large: {}", metrics.mape);
}

#[rstest]
#[case(400)]
#[case(730)]
fn test_multiplicative_close_to_additive(#[case] periods: usize) {
    let series = synthetic(periods);
    let score = |mode| {
        holdout_evaluation(
            &SeasonalTrendForecaster::new(),
            &series,
            28,
            mode,
            Frequency::Daily,
        )
        .unwrap()
    };

    let additive = score(SeasonalityMode::Additive);
    let multiplicative = score(SeasonalityMode::Multiplicative);
    assert!(
        multiplicative.mae <= additive.mae + 3.0,
        "multiplicative MAE {} vs additive MAE {}",
        multiplicative.mae,
        additive.mae
    );
}

#[test]
fn test_forecast_reports_history_len() {
    let series = flat_series(10, 3.0, Frequency::Daily);
    let forecast = forecast_series(
        &SeasonalTrendForecaster::new(),
        &series,
        5,
        SeasonalityMode::Additive,
        Frequency::Daily,
    )
    .unwrap();

    assert_eq!(forecast.history_len(), 10);
    assert_eq!(forecast.future_points().len(), 5);
}

#[test]
fn test_forecast_without_history_rejected() {
    let series = flat_series(10, 3.0, Frequency::Daily);

    let result = forecast_series(
        &FutureOnly,
        &series,
        4,
        SeasonalityMode::Additive,
        Frequency::Daily,
    );
    assert!(matches!(result, Err(ForecastError::ModelError(_))));

    let result = holdout_evaluation(
        &FutureOnly,
        &series,
        3,
        SeasonalityMode::Additive,
        Frequency::Daily,
    );
    assert!(matches!(result, Err(ForecastError::ModelError(_))));
}

#[test]
fn test_seasonal_model_needs_two_rows() {
    let series = flat_series(1, 3.0, Frequency::Daily);
    let result = SeasonalTrendForecaster::new().fit(&series, SeasonalityMode::Additive);

    assert!(matches!(result, Err(ForecastError::ModelError(_))));
}
