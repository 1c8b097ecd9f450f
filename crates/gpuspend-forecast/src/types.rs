//! Forecast request and result types

use chrono::NaiveDate;
use gpuspend_core::types::{DailyValue, GpuType, Provider};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Series being forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMetric {
    /// Daily GPU hours
    Usage,
    /// Daily spend in USD
    Spend,
}

impl fmt::Display for ForecastMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage => write!(f, "usage"),
            Self::Spend => write!(f, "spend"),
        }
    }
}

impl std::str::FromStr for ForecastMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usage" => Ok(Self::Usage),
            "spend" | "cost" => Ok(Self::Spend),
            _ => Err(format!("Invalid forecast metric: {s}")),
        }
    }
}

/// Estimation method that produced a forecast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// Last value plus linear trend, volatility bands
    MovingAverage,
    /// Gradient-boosted regression over lag features
    MlModel,
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MovingAverage => write!(f, "moving_average"),
            Self::MlModel => write!(f, "ml_model"),
        }
    }
}

/// One projected day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    /// Width of the confidence band
    pub fn band_width(&self) -> f64 {
        self.upper_bound - self.lower_bound
    }
}

/// Facts about how a forecast was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetadata {
    /// Length of the gap-filled history
    pub historical_data_points: usize,
    /// Day the forecast was computed
    pub forecast_generated_at: NaiveDate,
    /// Why the regression strategy was not used, when it was eligible
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// A completed forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub metric: ForecastMetric,
    pub provider: Option<Provider>,
    pub gpu_type: Option<GpuType>,
    pub horizon_days: u32,
    pub forecast_method: ForecastMethod,
    /// Gap-filled daily history
    pub historical: Vec<DailyValue>,
    /// `horizon_days` consecutive days after the last historical day
    pub forecast: Vec<ForecastPoint>,
    pub metadata: ForecastMetadata,
}

/// Returned instead of a forecast when history is too short
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsufficientData {
    pub error: String,
    pub historical: Vec<DailyValue>,
    pub forecast: Vec<ForecastPoint>,
}

impl InsufficientData {
    /// Build the structured error for `found` days of history
    pub fn new(required: usize, found: usize) -> Self {
        Self {
            error: format!(
                "Insufficient historical data. Need at least {required} days, found {found}."
            ),
            historical: Vec::new(),
            forecast: Vec::new(),
        }
    }
}

/// Outcome of a forecast request
///
/// Serializes to either the forecast itself or `{error, historical: [], forecast: []}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForecastOutcome {
    Ready(ForecastResult),
    InsufficientData(InsufficientData),
}

impl ForecastOutcome {
    /// The error message, if the forecast could not be produced
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::InsufficientData(e) => Some(&e.error),
        }
    }

    /// The forecast, if one was produced
    pub fn result(&self) -> Option<&ForecastResult> {
        match self {
            Self::Ready(result) => Some(result),
            Self::InsufficientData(_) => None,
        }
    }

    /// Projected points, empty on error
    pub fn forecast_points(&self) -> &[ForecastPoint] {
        match self {
            Self::Ready(result) => &result.forecast,
            Self::InsufficientData(e) => &e.forecast,
        }
    }
}
