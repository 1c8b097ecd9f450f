//! Analytics configuration
//!
//! Thresholds and rate constants shared by the recommendation rules, the
//! digest, and the alert checks. Defaults reproduce the production values;
//! the CLI overrides a subset from flags or environment variables.

use crate::error::{Result, SpendError};
use crate::timezone::TimezoneConfig;
use chrono::NaiveTime;

/// Tunables for recommendation rules and alerts
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    /// Flat hourly GPU price used in every savings estimate (USD)
    pub hourly_gpu_rate: f64,
    /// Pools below this utilization percentage are flagged as idle
    pub idle_utilization_threshold_pct: f64,
    /// Completed jobs strictly longer than this many hours are flagged
    pub long_running_threshold_hours: f64,
    /// Share of a long job's runtime assumed reducible by optimization
    pub long_running_reducible_fraction: f64,
    /// Start of business hours (inclusive)
    pub business_hours_start: NaiveTime,
    /// End of business hours (exclusive)
    pub business_hours_end: NaiveTime,
    /// Minimum business-hours jobs before a team is flagged
    pub off_hours_min_jobs: usize,
    /// Discount assumed available from off-peak scheduling
    pub off_peak_discount: f64,
    /// Daily spend above which a burn-rate alert fires (USD)
    pub burn_rate_threshold_usd: f64,
    /// Timezone business hours are evaluated in
    pub timezone: TimezoneConfig,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            hourly_gpu_rate: 3.50,
            idle_utilization_threshold_pct: 30.0,
            long_running_threshold_hours: 24.0,
            long_running_reducible_fraction: 0.20,
            business_hours_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            business_hours_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            off_hours_min_jobs: 3,
            off_peak_discount: 0.10,
            burn_rate_threshold_usd: 10_000.0,
            timezone: TimezoneConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the hourly GPU rate
    pub fn with_hourly_rate(mut self, rate: f64) -> Self {
        self.hourly_gpu_rate = rate;
        self
    }

    /// Override the burn-rate alert threshold
    pub fn with_burn_rate_threshold(mut self, threshold: f64) -> Self {
        self.burn_rate_threshold_usd = threshold;
        self
    }

    /// Override the business-hours timezone
    pub fn with_timezone(mut self, timezone: TimezoneConfig) -> Self {
        self.timezone = timezone;
        self
    }

    /// Reject values that would make savings arithmetic meaningless
    pub fn validate(&self) -> Result<()> {
        if !self.hourly_gpu_rate.is_finite() || self.hourly_gpu_rate < 0.0 {
            return Err(SpendError::Config(format!(
                "hourly GPU rate must be non-negative, got {}",
                self.hourly_gpu_rate
            )));
        }
        if !self.burn_rate_threshold_usd.is_finite() || self.burn_rate_threshold_usd < 0.0 {
            return Err(SpendError::Config(format!(
                "burn-rate threshold must be non-negative, got {}",
                self.burn_rate_threshold_usd
            )));
        }
        if self.business_hours_start >= self.business_hours_end {
            return Err(SpendError::Config(
                "business hours must start before they end".to_string(),
            ));
        }
        Ok(())
    }
}
