//! Error types for the demand_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Invalid parameters: non-positive periods, holdout size, unknown frequency
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// No recognizable column for one of the series axes
    #[error("Schema error: no {axis} column found (tried {expected}). Found: {found}")]
    SchemaError {
        /// Axis that could not be resolved ("date" or "value")
        axis: &'static str,
        /// Candidate names that were tried, comma separated
        expected: String,
        /// Column names present in the table, comma separated
        found: String,
    },

    /// Not enough valid rows, or rows violating the series invariants
    #[error("Data quality error: {0}")]
    DataQualityError(String),

    /// Fit or predict failure from a forecaster
    #[error("Model error: {0}")]
    ModelError(String),

    /// No alignable rows, or non-finite metrics
    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON serialization
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::SerializationError(err.to_string())
    }
}
