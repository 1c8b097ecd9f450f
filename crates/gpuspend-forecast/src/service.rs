//! Forecasting service
//!
//! Reads daily history from the repository, picks an estimation strategy by
//! history length and projects the requested horizon. Results are cached when
//! a cache was supplied; any cache failure is treated as a miss.

use crate::cache::{ForecastCache, cache_key};
use crate::config::ForecastConfig;
use crate::series::fill_gaps;
use crate::strategy::{ForecastStrategy, MovingAverageStrategy, train_regression};
use crate::types::{
    ForecastMetadata, ForecastMetric, ForecastOutcome, ForecastPoint, ForecastResult,
    InsufficientData,
};
use chrono::{Duration, Utc};
use gpuspend_core::Result;
use gpuspend_core::repository::{Repository, SeriesFilter};
use gpuspend_core::types::{DailyValue, GpuType, Provider};
use std::sync::Arc;
use tracing::{info, warn};

/// Usage and spend forecaster
pub struct ForecastingService {
    repository: Arc<dyn Repository>,
    cache: Option<Arc<dyn ForecastCache>>,
    config: ForecastConfig,
}

impl ForecastingService {
    /// Create a service with the default configuration
    pub fn new(repository: Arc<dyn Repository>, cache: Option<Arc<dyn ForecastCache>>) -> Self {
        Self {
            repository,
            cache,
            config: ForecastConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: ForecastConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast daily GPU hours
    pub async fn forecast_usage(
        &self,
        provider: Option<&str>,
        gpu_type: Option<&str>,
        horizon_days: u32,
    ) -> Result<ForecastOutcome> {
        self.forecast(ForecastMetric::Usage, provider, gpu_type, horizon_days)
            .await
    }

    /// Forecast daily spend
    pub async fn forecast_spend(
        &self,
        provider: Option<&str>,
        gpu_type: Option<&str>,
        horizon_days: u32,
    ) -> Result<ForecastOutcome> {
        self.forecast(ForecastMetric::Spend, provider, gpu_type, horizon_days)
            .await
    }

    /// Forecast a metric for an optional provider / GPU type
    ///
    /// The horizon is clamped into `1..=max_horizon_days`. Too little history
    /// yields [`ForecastOutcome::InsufficientData`]; only repository failures
    /// are returned as errors.
    pub async fn forecast(
        &self,
        metric: ForecastMetric,
        provider: Option<&str>,
        gpu_type: Option<&str>,
        horizon_days: u32,
    ) -> Result<ForecastOutcome> {
        let horizon_days = self.config.clamp_horizon(horizon_days);
        let provider = provider.map(Provider::new);
        let gpu_type = gpu_type.map(GpuType::new);

        let key = cache_key(metric, provider.as_ref(), gpu_type.as_ref(), horizon_days);
        if let Some(cached) = self.cached(&key).await {
            return Ok(ForecastOutcome::Ready(cached));
        }

        info!(
            "Generating {} forecast: provider={:?}, gpu_type={:?}, horizon={}",
            metric, provider, gpu_type, horizon_days
        );

        let filter = SeriesFilter {
            provider: provider.clone(),
            gpu_type: gpu_type.clone(),
        };
        let history = match metric {
            ForecastMetric::Usage => self.repository.daily_usage_history(&filter).await?,
            ForecastMetric::Spend => self.repository.daily_cost_history(&filter).await?,
        };

        if history.len() < self.config.min_data_points {
            warn!("Insufficient data for forecast: {} days", history.len());
            return Ok(ForecastOutcome::InsufficientData(InsufficientData::new(
                self.config.min_data_points,
                history.len(),
            )));
        }

        let historical = fill_gaps(&history);
        let values: Vec<f64> = historical.iter().map(|p| p.value).collect();
        let (strategy, fallback_reason) = self.select_strategy(&values);
        let forecast = Self::date_projection(&historical, strategy.as_ref(), horizon_days);

        let result = ForecastResult {
            metric,
            provider,
            gpu_type,
            horizon_days,
            forecast_method: strategy.method(),
            metadata: ForecastMetadata {
                historical_data_points: historical.len(),
                forecast_generated_at: Utc::now().date_naive(),
                fallback_reason,
            },
            historical,
            forecast,
        };

        self.store(&key, &result).await;
        Ok(ForecastOutcome::Ready(result))
    }

    /// Pick the strategy for a gap-filled series
    ///
    /// Returns the reason the regression strategy was skipped when the series
    /// was long enough to use it.
    pub fn select_strategy(&self, values: &[f64]) -> (Box<dyn ForecastStrategy>, Option<String>) {
        if values.len() < self.config.regression_min_points {
            info!("Using moving average forecast over {} points", values.len());
            return (Box::new(MovingAverageStrategy::fit(values)), None);
        }

        match train_regression(values, &self.config) {
            Ok(strategy) => {
                info!("Using regression forecast over {} points", values.len());
                (strategy, None)
            }
            Err(reason) => {
                warn!(
                    "Regression forecast unavailable ({}), falling back to moving average",
                    reason
                );
                let baseline: Box<dyn ForecastStrategy> =
                    Box::new(MovingAverageStrategy::fit(values));
                (baseline, Some(reason.to_string()))
            }
        }
    }

    fn date_projection(
        historical: &[DailyValue],
        strategy: &dyn ForecastStrategy,
        horizon_days: u32,
    ) -> Vec<ForecastPoint> {
        let Some(last) = historical.last() else {
            return Vec::new();
        };
        strategy
            .project(horizon_days as usize)
            .into_iter()
            .enumerate()
            .map(|(i, p)| ForecastPoint {
                date: last.date + Duration::days(i as i64 + 1),
                value: p.value,
                lower_bound: p.lower_bound,
                upper_bound: p.upper_bound,
            })
            .collect()
    }

    async fn cached(&self, key: &str) -> Option<ForecastResult> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(result) => {
                    info!(cache_key = key, "Cache hit for forecast");
                    Some(result)
                }
                Err(e) => {
                    warn!(cache_key = key, "Discarding unreadable cached forecast: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key = key, "Forecast cache read error: {}", e);
                None
            }
        }
    }

    async fn store(&self, key: &str, result: &ForecastResult) {
        let Some(cache) = &self.cache else {
            return;
        };
        let bytes = match serde_json::to_vec(result) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(cache_key = key, "Could not serialize forecast for caching: {}", e);
                return;
            }
        };
        match cache.set_with_ttl(key, bytes, self.config.cache_ttl).await {
            Ok(()) => info!(cache_key = key, "Cached forecast"),
            Err(e) => warn!(cache_key = key, "Forecast cache write error: {}", e),
        }
    }
}
