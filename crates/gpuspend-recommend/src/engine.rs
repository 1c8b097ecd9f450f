//! Recommendation engine
//!
//! Fetches the rows each rule needs from the repository, runs the rules in
//! order, then applies the request filters and summarises the result. A rule
//! whose input cannot be fetched contributes nothing; the request still
//! succeeds with the remaining rules.

use crate::rules::{self, PoolUtilization, Rule};
use crate::types::{Recommendation, RecommendationFilters, RecommendationResponse};
use chrono::{DateTime, Utc};
use gpuspend_core::repository::{JobQuery, Repository, SeriesFilter};
use gpuspend_core::types::{DateRange, JobStatus};
use gpuspend_core::{AnalyticsConfig, Result};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Rules-based recommendation generator
///
/// Stateless apart from its repository handle and configuration, so one engine
/// can serve concurrent callers.
pub struct RecommendationEngine {
    repository: Arc<dyn Repository>,
    config: AnalyticsConfig,
}

impl RecommendationEngine {
    /// Create an engine over a repository
    pub fn new(repository: Arc<dyn Repository>, config: AnalyticsConfig) -> Self {
        Self { repository, config }
    }

    /// Configuration the rules run with
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Generate recommendations for the filtered request
    ///
    /// Never fails: a top-level error yields an empty response with
    /// `summary.error` set.
    pub async fn generate(&self, filters: &RecommendationFilters) -> RecommendationResponse {
        match self.try_generate(filters).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error generating recommendations: {}", e);
                RecommendationResponse::failed(filters, e.to_string())
            }
        }
    }

    async fn try_generate(&self, filters: &RecommendationFilters) -> Result<RecommendationResponse> {
        self.config.validate()?;
        let range = DateRange::new(filters.start_date, filters.end_date)?;
        info!("Generating recommendations for date range: {}", range);

        let created_at = Utc::now();
        let mut generated = Vec::new();
        for rule in Rule::ALL {
            match self.evaluate(rule, &range, filters.team_id, created_at).await {
                Ok(recommendations) => {
                    debug!(rule = %rule, count = recommendations.len(), "Rule evaluated");
                    generated.extend(recommendations);
                }
                Err(e) => {
                    error!(rule = %rule, "Rule evaluation failed: {}", e);
                }
            }
        }

        let recommendations: Vec<Recommendation> = generated
            .into_iter()
            .filter(|r| filters.accepts(r))
            .collect();
        let response = RecommendationResponse::new(recommendations, range);
        info!(
            "Generated {} recommendations with ${:.2} potential savings",
            response.summary.total, response.total_estimated_savings_usd
        );

        Ok(response)
    }

    /// Run a single rule over the range
    ///
    /// The team restriction applies to the job-based rules only; cost and
    /// usage records carry no team attribution.
    pub async fn evaluate(
        &self,
        rule: Rule,
        range: &DateRange,
        team_id: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<Recommendation>> {
        match rule {
            Rule::IdleGpu => {
                let rows = self.repository.cost_by_gpu(range).await?;
                let mut pools = Vec::with_capacity(rows.len());
                for row in rows {
                    let filter = SeriesFilter::pool(&row.provider, &row.gpu_type);
                    let usage = self.repository.usage_hours(range, &filter).await?;
                    pools.push(PoolUtilization::new(row, usage));
                }
                Ok(rules::idle_gpu(range, &pools, &self.config, created_at))
            }
            Rule::LongRunningJob => {
                let query = JobQuery::new()
                    .with_team(team_id)
                    .with_status(JobStatus::Completed)
                    .finished_only()
                    .in_timezone(self.config.timezone);
                let jobs = self.repository.jobs_started_in(range, &query).await?;
                Ok(rules::long_running_jobs(range, &jobs, &self.config, created_at))
            }
            Rule::OffHoursUsage => {
                let query = JobQuery::new()
                    .with_team(team_id)
                    .in_timezone(self.config.timezone);
                let jobs = self.repository.jobs_started_in(range, &query).await?;
                Ok(rules::off_hours_usage(range, &jobs, &self.config, created_at))
            }
        }
    }
}
