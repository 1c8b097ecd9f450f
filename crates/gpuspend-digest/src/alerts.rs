//! Spend alert checks
//!
//! Two checks feed the notification layer: daily burn rate above a configured
//! threshold, and high-severity idle GPU pools over the last two weeks.

use chrono::{Duration, NaiveDate};
use gpuspend_core::repository::Repository;
use gpuspend_core::types::{DateRange, round2};
use gpuspend_core::{AnalyticsConfig, Result};
use gpuspend_recommend::{
    Recommendation, RecommendationEngine, RecommendationFilters, RecommendationType, Severity,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Days looked back by the idle-spend check
pub const IDLE_LOOKBACK_DAYS: i64 = 14;

/// Daily spend above the configured threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnRateAlert {
    pub date: NaiveDate,
    pub daily_cost: f64,
    pub threshold: f64,
    /// How far the spend exceeds the threshold, in percent of the threshold
    pub percentage_over: f64,
}

/// High-severity idle pools found over the lookback window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleSpendAlert {
    pub date_range: DateRange,
    pub recommendations: Vec<Recommendation>,
    pub total_savings: f64,
}

/// Runs the alert checks against a repository
pub struct AlertChecker {
    repository: Arc<dyn Repository>,
    engine: RecommendationEngine,
    threshold: f64,
}

impl AlertChecker {
    /// Create a checker using the configured burn-rate threshold
    pub fn new(repository: Arc<dyn Repository>, config: AnalyticsConfig) -> Self {
        let threshold = config.burn_rate_threshold_usd;
        let engine = RecommendationEngine::new(repository.clone(), config);
        Self {
            repository,
            engine,
            threshold,
        }
    }

    /// Burn-rate threshold in USD per day
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Alert when spend on `date` is strictly above the threshold
    pub async fn check_burn_rate(&self, date: NaiveDate) -> Result<Option<BurnRateAlert>> {
        let daily_cost = self.repository.total_cost(&DateRange::single(date)).await?;
        info!(
            "Burn rate check for {}: ${:.2} against threshold ${:.2}",
            date, daily_cost, self.threshold
        );

        if daily_cost <= self.threshold {
            return Ok(None);
        }

        let percentage_over = if self.threshold > 0.0 {
            (daily_cost - self.threshold) / self.threshold * 100.0
        } else {
            0.0
        };
        Ok(Some(BurnRateAlert {
            date,
            daily_cost: round2(daily_cost),
            threshold: self.threshold,
            percentage_over: round2(percentage_over),
        }))
    }

    /// Alert when the engine finds high-severity idle pools in `[today-14, today]`
    pub async fn check_idle_spend(&self, today: NaiveDate) -> Option<IdleSpendAlert> {
        let filters = RecommendationFilters::new(today - Duration::days(IDLE_LOOKBACK_DAYS), today)
            .with_min_severity(Severity::High)
            .with_types(vec![RecommendationType::IdleGpu]);
        let response = self.engine.generate(&filters).await;

        if let Some(error) = &response.summary.error {
            warn!("Idle spend check could not run: {}", error);
            return None;
        }
        if response.recommendations.is_empty() {
            info!("No high-severity idle spend found");
            return None;
        }

        info!(
            "Found {} high-severity idle pools",
            response.recommendations.len()
        );
        Some(IdleSpendAlert {
            date_range: response.date_range,
            total_savings: response.total_estimated_savings_usd,
            recommendations: response.recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpuspend_core::repository::MemoryRepository;
    use gpuspend_core::types::{CostRecord, UsageRecord};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn checker(repo: MemoryRepository, threshold: f64) -> AlertChecker {
        AlertChecker::new(
            Arc::new(repo),
            AnalyticsConfig::default().with_burn_rate_threshold(threshold),
        )
    }

    #[tokio::test]
    async fn test_burn_rate_over_threshold() {
        let mut repo = MemoryRepository::new();
        repo.add_cost(CostRecord::new(day(5), "aws", "h100", 9000.0).unwrap());
        repo.add_cost(CostRecord::new(day(5), "gcp", "h100", 3000.0).unwrap());

        let alert = checker(repo, 10_000.0)
            .check_burn_rate(day(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alert.daily_cost, 12_000.0);
        assert_eq!(alert.percentage_over, 20.0);
    }

    #[tokio::test]
    async fn test_burn_rate_at_threshold_is_quiet() {
        let mut repo = MemoryRepository::new();
        repo.add_cost(CostRecord::new(day(5), "aws", "h100", 10_000.0).unwrap());

        let alert = checker(repo, 10_000.0).check_burn_rate(day(5)).await.unwrap();
        assert!(alert.is_none());
    }

    #[tokio::test]
    async fn test_idle_spend_reports_idle_pools() {
        let mut repo = MemoryRepository::new();
        for d in 1..=15 {
            repo.add_cost(CostRecord::new(day(d), "aws", "a100", 84.0).unwrap());
            repo.add_cost(CostRecord::new(day(d), "gcp", "h100", 84.0).unwrap());
            // 50% utilization is not idle
            repo.add_usage(UsageRecord::new(day(d), "gcp", "h100", 12.0).unwrap());
        }

        let alert = checker(repo, 10_000.0).check_idle_spend(day(15)).await.unwrap();
        assert_eq!(alert.recommendations.len(), 1);
        assert_eq!(alert.date_range, DateRange::new(day(1), day(15)).unwrap());
        // 15 days * 24 h * 3.50
        assert_eq!(alert.total_savings, 1260.0);
    }

    #[tokio::test]
    async fn test_idle_spend_quiet_when_utilized() {
        let mut repo = MemoryRepository::new();
        for d in 1..=15 {
            repo.add_cost(CostRecord::new(day(d), "aws", "a100", 84.0).unwrap());
            repo.add_usage(UsageRecord::new(day(d), "aws", "a100", 20.0).unwrap());
        }
        assert!(checker(repo, 10_000.0).check_idle_spend(day(15)).await.is_none());
    }
}
