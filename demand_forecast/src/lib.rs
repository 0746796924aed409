//! # Demand Forecast
//!
//! Demand time series tooling for supply-chain planning.
//!
//! ## Features
//!
//! - Deterministic synthetic demand series (trend, weekly and yearly cycles, seeded noise)
//! - Tolerant CSV loading with column-name resolution and row cleaning
//! - Train/holdout splitting
//! - Forecasting behind the [`Forecaster`] trait, with a trend plus Fourier
//!   seasonality model supporting additive and multiplicative modes
//! - MAE/MAPE evaluation on a holdout window
//! - CSV export of series and forecasts, JSON export of metrics
//!
//! ## Quick Start
//!
//! ```no_run
//! use demand_forecast::models::seasonal::SeasonalTrendForecaster;
//! use demand_forecast::pipeline::{forecast_series, holdout_evaluation};
//! use demand_forecast::{export, Frequency, SeasonalityMode, SeriesLoader};
//!
//! # fn main() -> demand_forecast::Result<()> {
//! // Load data
//! let series = SeriesLoader::new("ds", "y").load_csv("data/synthetic_demand.csv")?;
//!
//! // Score the model on the last 30 rows
//! let forecaster = SeasonalTrendForecaster::new();
//! let metrics = holdout_evaluation(
//!     &forecaster,
//!     &series,
//!     30,
//!     SeasonalityMode::Multiplicative,
//!     Frequency::Daily,
//! )?;
//! println!("{}", metrics);
//!
//! // Forecast 30 days past the end of the data
//! let forecast = forecast_series(
//!     &forecaster,
//!     &series,
//!     30,
//!     SeasonalityMode::Multiplicative,
//!     Frequency::Daily,
//! )?;
//! export::save_forecast(&forecast, "out/forecast.csv")?;
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod export;
pub mod frequency;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod split;
pub mod synthetic;

// Re-export commonly used types
pub use crate::data::{Observation, SeriesLoader, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::frequency::Frequency;
pub use crate::metrics::{evaluate_forecast, Metrics};
pub use crate::models::{
    FittedForecaster, ForecastPoint, ForecastResult, Forecaster, SeasonalityMode,
};
pub use crate::split::split_train_test;
pub use crate::synthetic::{SyntheticSeriesGenerator, SyntheticSpec};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
