//! Forecast strategies
//!
//! A strategy is a model already fitted to a history; it projects a number of
//! days forward with a 95% confidence band. The baseline is always available.
//! The regression strategy is built through [`train_regression`], which
//! reports [`Unavailable`] instead of failing so callers can fall back.

use crate::config::ForecastConfig;
use crate::series::{first_differences, linear_slope, moving_average, std_dev};
use crate::types::ForecastMethod;
use thiserror::Error;
use tracing::debug;

/// z-score for a two-sided 95% interval
pub const Z_95: f64 = 1.96;

/// One projected step before dates are attached
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub value: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Attach widening confidence bands to point forecasts
///
/// The half-width at step `i` (1-indexed) is `1.96 * sigma * sqrt(i)`. Points
/// are floored at zero, lower bounds are floored at zero and upper bounds
/// never fall below the point.
pub fn with_confidence_band(points: &[f64], sigma: f64) -> Vec<Projection> {
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let value = point.max(0.0);
            let half_width = Z_95 * sigma.abs() * ((i + 1) as f64).sqrt();
            Projection {
                value,
                lower_bound: (value - half_width).max(0.0),
                upper_bound: (value + half_width).max(value),
            }
        })
        .collect()
}

/// A fitted forecasting model
pub trait ForecastStrategy: Send + Sync {
    /// Method reported in the forecast result
    fn method(&self) -> ForecastMethod;

    /// Project `horizon` days past the end of the fitted history
    fn project(&self, horizon: usize) -> Vec<Projection>;
}

/// Last value plus recent linear trend
///
/// The trend and volatility come from the trailing two weeks (or the whole
/// series when shorter).
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageStrategy {
    last_value: f64,
    slope: f64,
    volatility: f64,
    smoothed: Option<f64>,
}

impl MovingAverageStrategy {
    /// Trailing window used for trend and volatility
    pub const TREND_WINDOW: usize = 14;

    /// Fit to a gap-filled series
    pub fn fit(values: &[f64]) -> Self {
        let n = values.len();
        let window = (n / 2).clamp(3, 7);
        let smoothed = moving_average(values, window).last().copied();

        let recent = &values[n.saturating_sub(Self::TREND_WINDOW)..];
        let slope = linear_slope(recent);
        let volatility = if n > 1 {
            std_dev(&first_differences(recent))
        } else {
            0.0
        };

        debug!(
            "Baseline fit over {} points: slope={:.4}, volatility={:.4}, smoothed={:?}",
            n, slope, volatility, smoothed
        );

        Self {
            last_value: values.last().copied().unwrap_or(0.0),
            slope,
            volatility,
            smoothed,
        }
    }

    /// Fitted trend per day
    pub fn slope(&self) -> f64 {
        self.slope
    }

    /// Standard deviation of recent day-over-day changes
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Last full-window moving average, if the series was long enough
    pub fn smoothed(&self) -> Option<f64> {
        self.smoothed
    }
}

impl ForecastStrategy for MovingAverageStrategy {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::MovingAverage
    }

    fn project(&self, horizon: usize) -> Vec<Projection> {
        let points: Vec<f64> = (1..=horizon)
            .map(|i| self.last_value + self.slope * i as f64)
            .collect();
        with_confidence_band(&points, self.volatility)
    }
}

/// Why the regression strategy could not be built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Unavailable {
    /// Built without the `gbm` feature
    #[error("regression support is not compiled in")]
    NotCompiled,

    /// Too few rows remain once lag features are built
    #[error("only {rows} training rows after lagging, need at least {required}")]
    InsufficientSamples { rows: usize, required: usize },

    /// Training ran but produced an unusable model
    #[error("model training failed: {0}")]
    Training(String),
}

/// Train the regression strategy on a gap-filled series
#[cfg(feature = "gbm")]
pub fn train_regression(
    values: &[f64],
    config: &ForecastConfig,
) -> Result<Box<dyn ForecastStrategy>, Unavailable> {
    let strategy = crate::gbm::RegressionStrategy::train(values, config)?;
    Ok(Box::new(strategy))
}

/// Train the regression strategy on a gap-filled series
#[cfg(not(feature = "gbm"))]
pub fn train_regression(
    _values: &[f64],
    _config: &ForecastConfig,
) -> Result<Box<dyn ForecastStrategy>, Unavailable> {
    Err(Unavailable::NotCompiled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_follows_trend() {
        let values: Vec<f64> = (0..10).map(|i| 10.0 + 2.0 * i as f64).collect();
        let strategy = MovingAverageStrategy::fit(&values);

        assert!((strategy.slope() - 2.0).abs() < 1e-9);
        assert_eq!(strategy.volatility(), 0.0);

        let projected = strategy.project(3);
        assert_eq!(projected.len(), 3);
        assert!((projected[0].value - 30.0).abs() < 1e-9);
        assert!((projected[2].value - 34.0).abs() < 1e-9);
        // A perfectly linear series has no volatility band
        assert_eq!(projected[2].lower_bound, projected[2].value);
    }

    #[test]
    fn test_baseline_floors_declining_series_at_zero() {
        let values = vec![30.0, 25.0, 20.0, 15.0, 10.0, 5.0, 1.0];
        let projected = MovingAverageStrategy::fit(&values).project(5);

        for point in &projected {
            assert!(point.value >= 0.0);
            assert!(point.lower_bound >= 0.0);
            assert!(point.upper_bound >= point.value);
        }
        assert_eq!(projected[4].value, 0.0);
    }

    #[test]
    fn test_band_widens_with_horizon() {
        let bands = with_confidence_band(&[100.0; 5], 10.0);
        for pair in bands.windows(2) {
            assert!(pair[1].upper_bound - pair[1].lower_bound >= pair[0].upper_bound - pair[0].lower_bound);
        }
        assert!((bands[0].upper_bound - 119.6).abs() < 1e-9);
        assert!((bands[3].lower_bound - 60.8).abs() < 1e-9);
    }

    #[test]
    fn test_band_clamps_negative_points() {
        let bands = with_confidence_band(&[-5.0], 1.0);
        assert_eq!(bands[0].value, 0.0);
        assert_eq!(bands[0].lower_bound, 0.0);
        assert!(bands[0].upper_bound > 0.0);
    }

    #[test]
    fn test_smoothing_window() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        // Window is min(7, max(3, 4)) = 4
        let strategy = MovingAverageStrategy::fit(&values);
        assert_eq!(strategy.smoothed(), Some(6.5));
    }

    #[cfg(not(feature = "gbm"))]
    #[test]
    fn test_regression_reports_not_compiled() {
        let values = vec![1.0; 40];
        assert_eq!(
            train_regression(&values, &ForecastConfig::default()).err(),
            Some(Unavailable::NotCompiled)
        );
    }
}
