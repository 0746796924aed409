//! Calendar step units for series timestamps

use crate::error::{ForecastError, Result};
use chrono::{Duration, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Spacing between consecutive observations of a series
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One hour
    Hourly,
    /// One calendar day
    #[default]
    Daily,
    /// Seven calendar days
    Weekly,
    /// One calendar month, clamped to the last day for short months
    Monthly,
}

impl Frequency {
    /// Step `ts` forward by `steps` units of this frequency
    pub fn advance(self, ts: NaiveDateTime, steps: usize) -> Result<NaiveDateTime> {
        let overflow = || {
            ForecastError::ConfigurationError(format!(
                "Advancing {} by {} {} steps overflows the calendar",
                ts, steps, self
            ))
        };
        let n = i64::try_from(steps).map_err(|_| overflow())?;

        let advanced = match self {
            Frequency::Hourly => Duration::try_hours(n).and_then(|d| ts.checked_add_signed(d)),
            Frequency::Daily => Duration::try_days(n).and_then(|d| ts.checked_add_signed(d)),
            Frequency::Weekly => Duration::try_weeks(n).and_then(|d| ts.checked_add_signed(d)),
            Frequency::Monthly => {
                let months = u32::try_from(steps).map_err(|_| overflow())?;
                ts.checked_add_months(Months::new(months))
            }
        };

        advanced.ok_or_else(overflow)
    }

    /// Build `count` timestamps starting at `start` (inclusive)
    pub fn range(self, start: NaiveDateTime, count: usize) -> Result<Vec<NaiveDateTime>> {
        (0..count).map(|t| self.advance(start, t)).collect()
    }
}

impl FromStr for Frequency {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "h" | "1h" | "hourly" => Ok(Frequency::Hourly),
            "d" | "1d" | "daily" => Ok(Frequency::Daily),
            "w" | "1w" | "weekly" => Ok(Frequency::Weekly),
            "m" | "ms" | "1m" | "monthly" => Ok(Frequency::Monthly),
            _ => Err(ForecastError::ConfigurationError(format!(
                "Unsupported frequency: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alias = match self {
            Frequency::Hourly => "H",
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
            Frequency::Monthly => "M",
        };
        write!(f, "{}", alias)
    }
}
