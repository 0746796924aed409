//! Trend plus Fourier seasonality regression
//!
//! Demand is modelled as a linear trend combined with weekly and yearly
//! Fourier terms, either added to the trend or scaling it. Both parts are
//! fitted jointly in either mode; the multiplicative form is bilinear and is
//! solved by Gauss-Newton with step halving. Time is measured
//! in days so the model works for any observation frequency; there is no
//! daily (intra-day) seasonal component. Seasonal coefficients are
//! ridge-penalized, which keeps the yearly terms stable on histories
//! shorter than a year.

use crate::data::TimeSeries;
use crate::error::{ForecastError, Result};
use crate::frequency::Frequency;
use crate::models::{
    FittedForecaster, ForecastPoint, ForecastResult, Forecaster, SeasonalityMode,
};
use chrono::NaiveDateTime;
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use tracing::debug;

/// Fewest training rows a fit accepts
pub const MIN_TRAINING_ROWS: usize = 2;

const WEEKLY_PERIOD_DAYS: f64 = 7.0;
const YEARLY_PERIOD_DAYS: f64 = 365.25;
const WEEKLY_ORDER: usize = 3;
const YEARLY_ORDER: usize = 10;

/// Diagonal jitter added to every normal equation
const JITTER: f64 = 1e-8;
/// Smallest scaled trend level accepted in multiplicative mode
const MIN_LEVEL: f64 = 1e-9;

/// Gauss-Newton iterations for the multiplicative fit
const MAX_ITERATIONS: usize = 100;
/// Step halvings tried before a Gauss-Newton iteration gives up
const MAX_HALVINGS: usize = 30;
/// Relative loss decrease below which the multiplicative fit stops
const CONVERGENCE_TOLERANCE: f64 = 1e-12;

const MS_PER_DAY: f64 = 86_400_000.0;
const NS_PER_DAY: f64 = 86_400_000_000_000.0;

/// Linear trend with weekly and yearly Fourier seasonality
#[derive(Debug, Clone)]
pub struct SeasonalTrendForecaster {
    /// Name of the model
    name: String,
    /// Ridge penalty on the seasonal coefficients
    seasonality_penalty: f64,
    /// Probability mass inside the uncertainty interval, if intervals are produced
    interval_width: Option<f64>,
}

/// Fitted [`SeasonalTrendForecaster`]
#[derive(Debug, Clone)]
pub struct FittedSeasonalTrend {
    /// Name of the model
    name: String,
    /// Seasonality combination used during fitting
    mode: SeasonalityMode,
    /// Training series
    history: TimeSeries,
    /// First training timestamp, t = 0
    origin: NaiveDateTime,
    /// Days between first and last training timestamp
    span_days: f64,
    /// Divisor applied to values before fitting
    y_scale: f64,
    /// Trend intercept, scaled units
    intercept: f64,
    /// Trend slope per unit of scaled time, scaled units
    slope: f64,
    /// Fourier coefficients: weekly terms then yearly terms, sin/cos pairs
    seasonal: Vec<f64>,
    /// Standard deviation of in-sample residuals, original units
    residual_std: f64,
    /// Normal quantile for the interval half-width
    z: Option<f64>,
}

impl Default for SeasonalTrendForecaster {
    fn default() -> Self {
        Self {
            name: format!(
                "SeasonalTrend(weekly={}, yearly={})",
                WEEKLY_ORDER, YEARLY_ORDER
            ),
            seasonality_penalty: 1.0,
            interval_width: Some(0.8),
        }
    }
}

impl SeasonalTrendForecaster {
    /// Create a model with 80% intervals
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coverage of the uncertainty interval, strictly between 0 and 1
    pub fn with_interval_width(mut self, width: f64) -> Result<Self> {
        if !(width > 0.0 && width < 1.0) {
            return Err(ForecastError::ConfigurationError(format!(
                "interval width must be between 0 and 1, got {}",
                width
            )));
        }
        self.interval_width = Some(width);
        Ok(self)
    }

    /// Produce point estimates only
    pub fn without_intervals(mut self) -> Self {
        self.interval_width = None;
        self
    }

    /// Set the ridge penalty applied to seasonal coefficients
    pub fn with_seasonality_penalty(mut self, penalty: f64) -> Result<Self> {
        if !(penalty.is_finite() && penalty >= 0.0) {
            return Err(ForecastError::ConfigurationError(format!(
                "seasonality penalty must be a non-negative number, got {}",
                penalty
            )));
        }
        self.seasonality_penalty = penalty;
        Ok(self)
    }

    fn quantile(&self) -> Result<Option<f64>> {
        let Some(width) = self.interval_width else {
            return Ok(None);
        };
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::ModelError(format!("Normal distribution: {}", e)))?;
        Ok(Some(normal.inverse_cdf(0.5 + width / 2.0)))
    }
}

impl SeasonalTrendForecaster {
    /// Fit `trend * (1 + seasonal)` jointly by damped Gauss-Newton, starting
    /// from the trend alone. Returns intercept, slope, then seasonal weights.
    fn fit_multiplicative(
        &self,
        trend_rows: &[Vec<f64>],
        seasonal_rows: &[Vec<f64>],
        y: &[f64],
        trend: &[f64],
    ) -> Result<Vec<f64>> {
        let n_seasonal = seasonal_rows[0].len();
        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(self.seasonality_penalty).take(n_seasonal));

        let mut theta = vec![0.0; 2 + n_seasonal];
        theta[..2].copy_from_slice(trend);
        let mut loss = multiplicative_loss(&theta, trend_rows, seasonal_rows, y, &penalties);

        for iteration in 1..=MAX_ITERATIONS {
            // Linearize around theta; the linear problem's solution is the full step
            let mut jacobian = Vec::with_capacity(y.len());
            let mut targets = Vec::with_capacity(y.len());
            for ((trend_row, season_row), &value) in trend_rows.iter().zip(seasonal_rows).zip(y) {
                let level = theta[0] + theta[1] * trend_row[1];
                let season = dot(season_row, &theta[2..]);

                let mut row = vec![1.0 + season, trend_row[1] * (1.0 + season)];
                row.extend(season_row.iter().map(|x| level * x));
                targets.push(value - level * (1.0 + season) + dot(&row, &theta));
                jacobian.push(row);
            }
            let proposal = ridge(&jacobian, &targets, &penalties)?;

            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..MAX_HALVINGS {
                let candidate: Vec<f64> = theta
                    .iter()
                    .zip(&proposal)
                    .map(|(current, target)| current + step * (target - current))
                    .collect();
                let candidate_loss =
                    multiplicative_loss(&candidate, trend_rows, seasonal_rows, y, &penalties);
                if candidate_loss < loss {
                    accepted = Some((candidate, candidate_loss));
                    break;
                }
                step /= 2.0;
            }

            let Some((candidate, candidate_loss)) = accepted else {
                debug!(iteration, loss, "no further descent");
                break;
            };
            let improvement = loss - candidate_loss;
            theta = candidate;
            loss = candidate_loss;
            if improvement <= CONVERGENCE_TOLERANCE * loss.max(f64::MIN_POSITIVE) {
                debug!(iteration, loss, "multiplicative fit converged");
                break;
            }
        }

        Ok(theta)
    }
}

impl Forecaster for SeasonalTrendForecaster {
    type Fitted = FittedSeasonalTrend;

    fn fit(&self, training: &TimeSeries, mode: SeasonalityMode) -> Result<FittedSeasonalTrend> {
        let n = training.len();
        if n < MIN_TRAINING_ROWS {
            return Err(ForecastError::ModelError(format!(
                "Training series has {} rows, at least {} are required",
                n, MIN_TRAINING_ROWS
            )));
        }

        let origin = training.first().timestamp;
        let span_days = days_between(origin, training.last().timestamp);
        if !(span_days > 0.0 && span_days.is_finite()) {
            return Err(ForecastError::ModelError(format!(
                "Training timestamps must span a positive interval, got {} to {}",
                origin,
                training.last().timestamp
            )));
        }
        let y_scale = match training.values().iter().fold(0.0_f64, |m, v| m.max(v.abs())) {
            m if m > 0.0 => m,
            _ => 1.0,
        };

        let t_days: Vec<f64> = training
            .timestamps()
            .into_iter()
            .map(|ts| days_between(origin, ts))
            .collect();
        let y: Vec<f64> = training.values().iter().map(|v| v / y_scale).collect();
        let trend_rows: Vec<Vec<f64>> = t_days.iter().map(|t| vec![1.0, t / span_days]).collect();
        let seasonal_rows: Vec<Vec<f64>> = t_days.iter().map(|&t| fourier_terms(t)).collect();
        let n_seasonal = seasonal_rows[0].len();

        let (intercept, slope, seasonal) = match mode {
            SeasonalityMode::Additive => {
                let rows: Vec<Vec<f64>> = trend_rows
                    .iter()
                    .zip(&seasonal_rows)
                    .map(|(trend, season)| trend.iter().chain(season).copied().collect())
                    .collect();
                let mut penalties = vec![0.0, 0.0];
                penalties.extend(std::iter::repeat(self.seasonality_penalty).take(n_seasonal));

                let beta = ridge(&rows, &y, &penalties)?;
                (beta[0], beta[1], beta[2..].to_vec())
            }
            SeasonalityMode::Multiplicative => {
                let beta = ridge(&trend_rows, &y, &[0.0, 0.0])?;
                ensure_positive_trend(beta[0], beta[1], y_scale)?;

                let theta = self.fit_multiplicative(&trend_rows, &seasonal_rows, &y, &beta)?;
                ensure_positive_trend(theta[0], theta[1], y_scale)?;
                (theta[0], theta[1], theta[2..].to_vec())
            }
        };

        let mut fitted = FittedSeasonalTrend {
            name: self.name.clone(),
            mode,
            history: training.clone(),
            origin,
            span_days,
            y_scale,
            intercept,
            slope,
            seasonal,
            residual_std: 0.0,
            z: self.quantile()?,
        };

        let sse: f64 = training
            .observations()
            .iter()
            .map(|o| (o.value - fitted.estimate(o.timestamp)).powi(2))
            .sum();
        fitted.residual_std = (sse / n as f64).sqrt();

        debug!(
            model = %fitted.name,
            mode = %mode,
            rows = n,
            residual_std = fitted.residual_std,
            "fitted seasonal trend model"
        );
        Ok(fitted)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedSeasonalTrend {
    /// Point estimate at an arbitrary timestamp, original units
    pub fn estimate(&self, timestamp: NaiveDateTime) -> f64 {
        let t_days = days_between(self.origin, timestamp);
        let level = self.intercept + self.slope * t_days / self.span_days;
        let season: f64 = fourier_terms(t_days)
            .iter()
            .zip(&self.seasonal)
            .map(|(x, b)| x * b)
            .sum();

        let scaled = match self.mode {
            SeasonalityMode::Additive => level + season,
            SeasonalityMode::Multiplicative => level * (1.0 + season),
        };
        scaled * self.y_scale
    }

    /// Standard deviation of the in-sample residuals
    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }

    /// Name of the model
    pub fn name(&self) -> &str {
        &self.name
    }

    fn point(&self, timestamp: NaiveDateTime, steps_ahead: usize) -> ForecastPoint {
        let estimate = self.estimate(timestamp);
        match self.z {
            Some(z) => {
                // Widen with distance from the training window
                let growth = (1.0 + steps_ahead as f64 / self.history.len() as f64).sqrt();
                let half_width = z * self.residual_std * growth;
                ForecastPoint::with_bounds(
                    timestamp,
                    estimate,
                    estimate - half_width,
                    estimate + half_width,
                )
            }
            None => ForecastPoint::new(timestamp, estimate),
        }
    }
}

impl FittedForecaster for FittedSeasonalTrend {
    fn predict(&self, horizon: usize, frequency: Frequency) -> Result<ForecastResult> {
        let last = self.history.last().timestamp;
        let mut points: Vec<ForecastPoint> = self
            .history
            .observations()
            .iter()
            .map(|o| self.point(o.timestamp, 0))
            .collect();

        for step in 1..=horizon {
            points.push(self.point(frequency.advance(last, step)?, step));
        }

        debug!(history = self.history.len(), horizon, "predicted");
        ForecastResult::with_history(points, self.history.len())
    }

    fn history(&self) -> &TimeSeries {
        &self.history
    }
}

fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let delta = to - from;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / NS_PER_DAY,
        None => delta.num_milliseconds() as f64 / MS_PER_DAY,
    }
}

/// Scaled time runs from 0 to 1, so the linear trend is lowest at an end
fn ensure_positive_trend(intercept: f64, slope: f64, y_scale: f64) -> Result<()> {
    let lowest = intercept.min(intercept + slope);
    if lowest <= MIN_LEVEL || !lowest.is_finite() {
        return Err(ForecastError::ModelError(format!(
            "Multiplicative seasonality needs a positive trend, fitted level is {:.4}",
            lowest * y_scale
        )));
    }
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Penalized squared error of `trend * (1 + seasonal)`, scaled units
fn multiplicative_loss(
    theta: &[f64],
    trend_rows: &[Vec<f64>],
    seasonal_rows: &[Vec<f64>],
    y: &[f64],
    penalties: &[f64],
) -> f64 {
    let sse: f64 = trend_rows
        .iter()
        .zip(seasonal_rows)
        .zip(y)
        .map(|((trend_row, season_row), value)| {
            let level = theta[0] + theta[1] * trend_row[1];
            (value - level * (1.0 + dot(season_row, &theta[2..]))).powi(2)
        })
        .sum();
    let penalty: f64 = theta.iter().zip(penalties).map(|(b, p)| p * b * b).sum();
    sse + penalty
}

/// Weekly then yearly sin/cos pairs at `t_days`
fn fourier_terms(t_days: f64) -> Vec<f64> {
    let mut terms = Vec::with_capacity(2 * (WEEKLY_ORDER + YEARLY_ORDER));
    for (period, order) in [
        (WEEKLY_PERIOD_DAYS, WEEKLY_ORDER),
        (YEARLY_PERIOD_DAYS, YEARLY_ORDER),
    ] {
        for k in 1..=order {
            let angle = 2.0 * PI * k as f64 * t_days / period;
            terms.push(angle.sin());
            terms.push(angle.cos());
        }
    }
    terms
}

/// Penalized least squares: minimize |y - X b|^2 + sum(penalty_j * b_j^2)
fn ridge(rows: &[Vec<f64>], y: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    let k = penalties.len();
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];

    for (row, &target) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in 0..=i {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += penalties[i] + JITTER;
    }

    solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ModelError("Normal equations are not positive definite".to_string())
    })
}

/// Solve A x = b for symmetric positive definite A by Cholesky decomposition
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum = a[i][j] - (0..j).map(|k| l[i][k] * l[j][k]).sum::<f64>();
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // Forward substitution: L y = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        z[i] = (b[i] - (0..i).map(|j| l[i][j] * z[j]).sum::<f64>()) / l[i][i];
    }

    // Backward substitution: L' x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        x[i] = (z[i] - ((i + 1)..n).map(|j| l[j][i] * x[j]).sum::<f64>()) / l[i][i];
    }

    Some(x)
}
