//! Daily digest generation
//!
//! A digest is a snapshot for one target date: spend over the day, the
//! trailing week and the trailing 30 days, the day-over-day trend, the pools
//! that cost the most that day and the best recommendations for the trailing
//! two weeks.

use chrono::{Duration, NaiveDate};
use gpuspend_core::repository::Repository;
use gpuspend_core::types::{DateRange, GpuType, Provider, round2};
use gpuspend_core::{AnalyticsConfig, Result};
use gpuspend_recommend::{
    Recommendation, RecommendationEngine, RecommendationFilters, Severity,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Pools and recommendations listed in the global section
pub const TOP_N: usize = 5;

/// Days covered by the weekly total, target date included
pub const WEEK_DAYS: u32 = 7;

/// Days covered by the monthly total, target date included
pub const MONTH_DAYS: u32 = 30;

/// Days of history the recommendation section analyses, target date included
pub const RECOMMENDATION_DAYS: u32 = 14;

/// A (provider, GPU type) pool ranked by spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopContributor {
    pub provider: Provider,
    pub gpu_type: GpuType,
    /// Display label, e.g. `H100 (AWS)`
    pub label: String,
    pub cost: f64,
}

impl TopContributor {
    fn new(provider: Provider, gpu_type: GpuType, cost: f64) -> Self {
        let label = format!(
            "{} ({})",
            gpu_type.as_str().to_uppercase(),
            provider.as_str().to_uppercase()
        );
        Self {
            provider,
            gpu_type,
            label,
            cost: round2(cost),
        }
    }
}

/// Condensed recommendation for the digest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestRecommendation {
    pub title: String,
    pub savings: f64,
    pub severity: Severity,
    pub description: String,
}

impl From<&Recommendation> for DigestRecommendation {
    fn from(rec: &Recommendation) -> Self {
        Self {
            title: rec.title.clone(),
            savings: rec.estimated_savings_usd,
            severity: rec.severity,
            description: rec.description.clone(),
        }
    }
}

/// Per-team section of the digest
///
/// Cost records carry no team attribution, so digests currently always emit
/// an empty team list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDigest {
    pub team_name: String,
    pub daily_cost: f64,
    pub weekly_cost: f64,
    pub monthly_cost: f64,
    pub daily_change_percent: f64,
}

/// Snapshot report for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestPayload {
    pub date: NaiveDate,
    pub total_daily_cost: f64,
    pub total_weekly_cost: f64,
    pub total_monthly_cost: f64,
    /// Change against the previous day, 0 when the previous day had no spend
    pub daily_change_percent: f64,
    pub teams: Vec<TeamDigest>,
    pub global_top_contributors: Vec<TopContributor>,
    pub global_recommendations: Vec<DigestRecommendation>,
    /// Savings over every recommendation in the window, not just the top ones
    pub global_potential_savings: f64,
}

/// Day-over-day change in percent
///
/// # Examples
/// ```
/// use gpuspend_digest::digest::percent_change;
///
/// assert_eq!(percent_change(100.0, 80.0), 25.0);
/// assert_eq!(percent_change(100.0, 0.0), 0.0);
/// ```
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else {
        0.0
    }
}

/// Builds [`DigestPayload`]s
pub struct DigestGenerator {
    repository: Arc<dyn Repository>,
    engine: RecommendationEngine,
}

impl DigestGenerator {
    /// Create a generator that runs its own recommendation engine
    pub fn new(repository: Arc<dyn Repository>, config: AnalyticsConfig) -> Self {
        let engine = RecommendationEngine::new(repository.clone(), config);
        Self { repository, engine }
    }

    /// Generate the digest for `target_date`
    pub async fn generate(&self, target_date: NaiveDate) -> Result<DigestPayload> {
        info!("Generating daily digest for {}", target_date);

        let today = DateRange::single(target_date);
        let previous = DateRange::single(target_date - Duration::days(1));

        let total_daily_cost = self.repository.total_cost(&today).await?;
        let previous_daily_cost = self.repository.total_cost(&previous).await?;
        let total_weekly_cost = self
            .repository
            .total_cost(&DateRange::trailing(target_date, WEEK_DAYS))
            .await?;
        let total_monthly_cost = self
            .repository
            .total_cost(&DateRange::trailing(target_date, MONTH_DAYS))
            .await?;

        let global_top_contributors = self.top_contributors(&today).await?;

        let window = DateRange::trailing(target_date, RECOMMENDATION_DAYS);
        let response = self
            .engine
            .generate(&RecommendationFilters::for_range(&window))
            .await;
        if let Some(error) = &response.summary.error {
            warn!("Digest recommendations unavailable: {}", error);
        }

        Ok(DigestPayload {
            date: target_date,
            total_daily_cost: round2(total_daily_cost),
            total_weekly_cost: round2(total_weekly_cost),
            total_monthly_cost: round2(total_monthly_cost),
            daily_change_percent: round2(percent_change(total_daily_cost, previous_daily_cost)),
            teams: Vec::new(),
            global_top_contributors,
            global_recommendations: response
                .top_by_savings(TOP_N)
                .into_iter()
                .map(DigestRecommendation::from)
                .collect(),
            global_potential_savings: response.total_estimated_savings_usd,
        })
    }

    async fn top_contributors(&self, range: &DateRange) -> Result<Vec<TopContributor>> {
        let mut rows = self.repository.cost_by_gpu(range).await?;
        rows.sort_by(|a, b| b.total_cost.total_cmp(&a.total_cost));
        Ok(rows
            .into_iter()
            .take(TOP_N)
            .map(|row| TopContributor::new(row.provider, row.gpu_type, row.total_cost))
            .collect())
    }
}
