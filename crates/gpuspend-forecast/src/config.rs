//! Forecasting configuration

use std::time::Duration;

/// Hyperparameters for the gradient-boosted regression strategy
#[derive(Debug, Clone, PartialEq)]
pub struct BoostingParams {
    /// Maximum boosting rounds
    pub rounds: usize,
    /// Shrinkage applied to every tree's output
    pub learning_rate: f64,
    /// Maximum depth of each regression tree
    pub max_depth: usize,
    /// Minimum samples in any leaf
    pub min_samples_leaf: usize,
    /// Stop when training RMSE has not improved for this many rounds
    pub early_stopping_rounds: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            rounds: 50,
            learning_rate: 0.05,
            max_depth: 3,
            min_samples_leaf: 2,
            early_stopping_rounds: 10,
        }
    }
}

/// Tunables for the forecasting service
///
/// # Examples
/// ```
/// use gpuspend_forecast::ForecastConfig;
///
/// let config = ForecastConfig::default();
/// assert_eq!(config.clamp_horizon(0), 1);
/// assert_eq!(config.clamp_horizon(90), 30);
/// assert_eq!(config.clamp_horizon(14), 14);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    /// Fewest distinct history days that still produce a forecast
    pub min_data_points: usize,
    /// Filled series length at which the regression strategy is tried
    pub regression_min_points: usize,
    /// Horizon used when the caller does not pass one
    pub default_horizon_days: u32,
    /// Largest accepted horizon
    pub max_horizon_days: u32,
    /// Lifetime of cached forecasts
    pub cache_ttl: Duration,
    /// Lags used when the series is short
    pub short_lags: Vec<usize>,
    /// Lags used once the series covers two weeks
    pub long_lags: Vec<usize>,
    /// Fewest lagged training rows the regression strategy accepts
    pub min_training_rows: usize,
    /// Regression tree ensemble parameters
    pub boosting: BoostingParams,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_data_points: 7,
            regression_min_points: 30,
            default_horizon_days: 7,
            max_horizon_days: 30,
            cache_ttl: Duration::from_secs(3600),
            short_lags: vec![1, 2, 3],
            long_lags: vec![1, 2, 3, 7, 14],
            min_training_rows: 10,
            boosting: BoostingParams::default(),
        }
    }
}

impl ForecastConfig {
    /// Clamp a requested horizon into `1..=max_horizon_days`
    pub fn clamp_horizon(&self, horizon_days: u32) -> u32 {
        horizon_days.clamp(1, self.max_horizon_days.max(1))
    }

    /// Lags to use for a series of `n` points
    pub fn lags_for(&self, n: usize) -> &[usize] {
        if n >= 14 {
            &self.long_lags
        } else {
            &self.short_lags
        }
    }
}
