//! Deterministic synthetic demand series
//!
//! The generated signal is `base + trend + weekly + yearly + noise`, clamped
//! to stay positive and rounded to cents. Noise comes from an explicitly
//! seeded generator, so a [`SyntheticSpec`] fully determines the output.

use crate::data::{Observation, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::frequency::Frequency;
use chrono::{Datelike, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Lowest demand a generated period may carry
const MIN_DEMAND: f64 = 1.0;

/// Parameters of a synthetic series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    start_date: NaiveDate,
    periods: usize,
    frequency: Frequency,
    seed: u64,
}

impl SyntheticSpec {
    /// Create a spec, rejecting an empty series
    pub fn new(
        start_date: NaiveDate,
        periods: usize,
        frequency: Frequency,
        seed: u64,
    ) -> Result<Self> {
        if periods == 0 {
            return Err(ForecastError::ConfigurationError(
                "periods must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            start_date,
            periods,
            frequency,
            seed,
        })
    }

    /// First date of the series
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Number of rows to generate
    pub fn periods(&self) -> usize {
        self.periods
    }

    /// Step between rows
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Seed of the noise generator
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for SyntheticSpec {
    /// Two years of daily data starting January 1st of the current year, seed 42
    fn default() -> Self {
        let start_date = NaiveDate::from_ymd_opt(Local::now().year(), 1, 1).unwrap_or_default();
        Self {
            start_date,
            periods: 730,
            frequency: Frequency::Daily,
            seed: 42,
        }
    }
}

/// Generator for synthetic demand series
#[derive(Debug, Clone)]
pub struct SyntheticSeriesGenerator {
    /// Level at t = 0
    base: f64,
    /// Increase per period
    trend_rate: f64,
    /// Amplitude of the 7-period cycle
    weekly_amplitude: f64,
    /// Amplitude of the 365-period cycle
    yearly_amplitude: f64,
    /// Standard deviation of the Gaussian noise
    noise_std: f64,
}

impl Default for SyntheticSeriesGenerator {
    fn default() -> Self {
        Self {
            base: 120.0,
            trend_rate: 0.04,
            weekly_amplitude: 12.0,
            yearly_amplitude: 18.0,
            noise_std: 6.0,
        }
    }
}

impl SyntheticSeriesGenerator {
    /// Create a generator with the standard demand shape
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a series, seeding the noise from `spec.seed()`
    pub fn generate(&self, spec: &SyntheticSpec) -> Result<TimeSeries> {
        let mut rng = StdRng::seed_from_u64(spec.seed());
        self.generate_with_rng(spec, &mut rng)
    }

    /// Generate a series drawing one noise sample per period from `rng`
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        spec: &SyntheticSpec,
        rng: &mut R,
    ) -> Result<TimeSeries> {
        // Specs can also arrive through serde, which skips `SyntheticSpec::new`
        if spec.periods() == 0 {
            return Err(ForecastError::ConfigurationError(
                "periods must be greater than 0".to_string(),
            ));
        }

        let noise = Normal::new(0.0, self.noise_std)
            .map_err(|e| ForecastError::ConfigurationError(format!("Invalid noise: {}", e)))?;

        let start = spec
            .start_date()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ForecastError::ConfigurationError("Invalid start date".to_string()))?;
        let timestamps = spec.frequency().range(start, spec.periods())?;

        let observations = timestamps
            .into_iter()
            .enumerate()
            .map(|(t, timestamp)| {
                let value = self.signal(t as f64) + noise.sample(&mut *rng);
                Observation::new(timestamp, round_cents(value.max(MIN_DEMAND)))
            })
            .collect();

        debug!(
            periods = spec.periods(),
            seed = spec.seed(),
            frequency = %spec.frequency(),
            "generated synthetic demand"
        );
        TimeSeries::new(observations)
    }

    /// Noise-free demand at index `t`
    fn signal(&self, t: f64) -> f64 {
        self.base
            + self.trend_rate * t
            + self.weekly_amplitude * (2.0 * PI * t / 7.0).sin()
            + self.yearly_amplitude * (2.0 * PI * t / 365.0).sin()
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spec(periods: usize, seed: u64) -> SyntheticSpec {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        SyntheticSpec::new(start, periods, Frequency::Daily, seed).unwrap()
    }

    #[test]
    fn test_zero_periods_rejected() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let result = SyntheticSpec::new(start, 0, Frequency::Daily, 1);
        assert!(matches!(result, Err(ForecastError::ConfigurationError(_))));
    }

    #[test]
    fn test_deserialized_zero_periods_rejected() {
        let raw = r#"{"start_date":"2024-01-01","periods":0,"frequency":"daily","seed":3}"#;
        let spec: SyntheticSpec = serde_json::from_str(raw).unwrap();
        let result = SyntheticSeriesGenerator::new().generate(&spec);
        assert!(matches!(result, Err(ForecastError::ConfigurationError(_))));
    }

    #[test]
    fn test_same_seed_same_series() {
        let generator = SyntheticSeriesGenerator::new();
        let first = generator.generate(&spec(200, 7)).unwrap();
        let second = generator.generate(&spec(200, 7)).unwrap();
        assert_eq!(first, second);

        let other = generator.generate(&spec(200, 8)).unwrap();
        assert_ne!(first.values(), other.values());
    }

    #[test]
    fn test_explicit_rng_matches_seeded_generate() {
        let generator = SyntheticSeriesGenerator::new();
        let mut rng = StdRng::seed_from_u64(11);
        let explicit = generator.generate_with_rng(&spec(50, 11), &mut rng).unwrap();
        let seeded = generator.generate(&spec(50, 11)).unwrap();
        assert_eq!(explicit, seeded);
    }

    #[test]
    fn test_values_clamped_and_rounded() {
        let generator = SyntheticSeriesGenerator {
            base: -500.0,
            ..SyntheticSeriesGenerator::default()
        };
        let series = generator.generate(&spec(30, 1)).unwrap();
        assert!(series.values().iter().all(|&v| v == MIN_DEMAND));

        let series = SyntheticSeriesGenerator::new().generate(&spec(30, 1)).unwrap();
        for v in series.values() {
            assert!((v * 100.0 - (v * 100.0).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_default_spec() {
        let spec = SyntheticSpec::default();
        assert_eq!(spec.periods(), 730);
        assert_eq!(spec.frequency(), Frequency::Daily);
        assert_eq!(spec.seed(), 42);
        assert_eq!((spec.start_date().month(), spec.start_date().day()), (1, 1));
    }
}
