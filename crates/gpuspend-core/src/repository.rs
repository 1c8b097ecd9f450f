//! Time-series repository interface
//!
//! The analytics core never owns storage. It reads daily cost and usage
//! aggregates and job rows through the [`Repository`] trait, which any storage
//! technology can implement. [`MemoryRepository`] is the in-process
//! implementation used by the CLI and the test suites.

use crate::error::Result;
use crate::timezone::TimezoneConfig;
use crate::types::{
    CostRecord, DailyValue, DateRange, GpuType, JobRecord, JobStatus, Provider, Team, UsageRecord,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Optional provider / GPU type restriction for series and usage queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SeriesFilter {
    /// Only include this provider
    pub provider: Option<Provider>,
    /// Only include this GPU type
    pub gpu_type: Option<GpuType>,
}

impl SeriesFilter {
    /// Create a filter with no restrictions
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one provider
    pub fn with_provider(mut self, provider: impl Into<Provider>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Restrict to one GPU type
    pub fn with_gpu_type(mut self, gpu_type: impl Into<GpuType>) -> Self {
        self.gpu_type = Some(gpu_type.into());
        self
    }

    /// Filter for exactly one (provider, GPU type) pool
    pub fn pool(provider: &Provider, gpu_type: &GpuType) -> Self {
        Self {
            provider: Some(provider.clone()),
            gpu_type: Some(gpu_type.clone()),
        }
    }

    /// Check whether a pool passes the filter
    pub fn matches(&self, provider: &Provider, gpu_type: &GpuType) -> bool {
        self.provider.as_ref().is_none_or(|p| p == provider)
            && self.gpu_type.as_ref().is_none_or(|g| g == gpu_type)
    }
}

/// Spend summed over a date range for one (provider, GPU type) pool
#[derive(Debug, Clone, PartialEq)]
pub struct GpuCostRow {
    /// Cloud provider
    pub provider: Provider,
    /// GPU type
    pub gpu_type: GpuType,
    /// Summed spend in USD
    pub total_cost: f64,
    /// Distinct days with a cost record
    pub days_count: u32,
}

/// Restrictions applied to job queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    /// Only jobs owned by this team
    pub team_id: Option<Uuid>,
    /// Only jobs in this state
    pub status: Option<JobStatus>,
    /// Only jobs with an end time
    pub require_end_time: bool,
    /// Timezone whose calendar decides a job's start date
    pub timezone: TimezoneConfig,
}

impl JobQuery {
    /// Query with no restrictions beyond the date range
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one team
    pub fn with_team(mut self, team_id: Option<Uuid>) -> Self {
        self.team_id = team_id;
        self
    }

    /// Restrict to one status
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Require an end time
    pub fn finished_only(mut self) -> Self {
        self.require_end_time = true;
        self
    }

    /// Read start dates in this timezone instead of UTC
    pub fn in_timezone(mut self, timezone: TimezoneConfig) -> Self {
        self.timezone = timezone;
        self
    }

    /// Start date of a job on this query's calendar
    pub fn start_date(&self, job: &JobRecord) -> Option<NaiveDate> {
        job.start_time.map(|ts| self.timezone.local_date(ts))
    }

    fn matches(&self, job: &JobRecord) -> bool {
        if self.team_id.is_some_and(|team| team != job.team_id) {
            return false;
        }
        if self.status.is_some_and(|status| status != job.status) {
            return false;
        }
        !(self.require_end_time && job.end_time.is_none())
    }
}

/// A job joined with the name of its owning team
#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    /// The job itself
    pub job: JobRecord,
    /// Owning team's display name
    pub team_name: String,
}

/// Read-only access to cost, usage, and job history
///
/// All date ranges are inclusive on both ends and provider / GPU comparisons
/// are made on normalized names.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Spend per (provider, GPU type) over the range, with distinct day counts
    async fn cost_by_gpu(&self, range: &DateRange) -> Result<Vec<GpuCostRow>>;

    /// Total spend over the range, 0 when there are no records
    async fn total_cost(&self, range: &DateRange) -> Result<f64>;

    /// Summed GPU hours over the range for the filtered pools, 0 when missing
    async fn usage_hours(&self, range: &DateRange, filter: &SeriesFilter) -> Result<f64>;

    /// Spend summed per calendar day across all history, ordered by date
    async fn daily_cost_history(&self, filter: &SeriesFilter) -> Result<Vec<DailyValue>>;

    /// GPU hours summed per calendar day across all history, ordered by date
    async fn daily_usage_history(&self, filter: &SeriesFilter) -> Result<Vec<DailyValue>>;

    /// Jobs whose start date falls in the range, joined with their team name
    ///
    /// The start date is read in the query's timezone (UTC unless set).
    async fn jobs_started_in(&self, range: &DateRange, query: &JobQuery) -> Result<Vec<JobRow>>;
}

#[async_trait]
impl<R: Repository + ?Sized> Repository for Arc<R> {
    async fn cost_by_gpu(&self, range: &DateRange) -> Result<Vec<GpuCostRow>> {
        (**self).cost_by_gpu(range).await
    }

    async fn total_cost(&self, range: &DateRange) -> Result<f64> {
        (**self).total_cost(range).await
    }

    async fn usage_hours(&self, range: &DateRange, filter: &SeriesFilter) -> Result<f64> {
        (**self).usage_hours(range, filter).await
    }

    async fn daily_cost_history(&self, filter: &SeriesFilter) -> Result<Vec<DailyValue>> {
        (**self).daily_cost_history(filter).await
    }

    async fn daily_usage_history(&self, filter: &SeriesFilter) -> Result<Vec<DailyValue>> {
        (**self).daily_usage_history(filter).await
    }

    async fn jobs_started_in(&self, range: &DateRange, query: &JobQuery) -> Result<Vec<JobRow>> {
        (**self).jobs_started_in(range, query).await
    }
}

type PoolKey = (NaiveDate, Provider, GpuType);

/// In-memory repository
///
/// Cost and usage records are unique per (date, provider, GPU type); inserting
/// a duplicate replaces the earlier record. Jobs are unique per `job_id`.
/// Jobs whose team is not registered are excluded from job queries.
///
/// # Examples
/// ```
/// use gpuspend_core::repository::{MemoryRepository, Repository};
/// use gpuspend_core::types::{CostRecord, DateRange};
/// use chrono::NaiveDate;
///
/// # async fn example() -> gpuspend_core::Result<()> {
/// let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// let mut repo = MemoryRepository::new();
/// repo.add_cost(CostRecord::new(day, "AWS", "H100", 120.0)?);
///
/// let total = repo.total_cost(&DateRange::single(day)).await?;
/// assert_eq!(total, 120.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    teams: HashMap<Uuid, Team>,
    costs: BTreeMap<PoolKey, CostRecord>,
    usage: BTreeMap<PoolKey, UsageRecord>,
    jobs: Vec<JobRecord>,
}

impl MemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a team
    pub fn add_team(&mut self, team: Team) {
        self.teams.insert(team.id, team);
    }

    /// Insert or replace a daily cost record
    pub fn add_cost(&mut self, record: CostRecord) {
        let key = (record.date, record.provider.clone(), record.gpu_type.clone());
        self.costs.insert(key, record);
    }

    /// Insert or replace a daily usage record
    pub fn add_usage(&mut self, record: UsageRecord) {
        let key = (record.date, record.provider.clone(), record.gpu_type.clone());
        self.usage.insert(key, record);
    }

    /// Insert or replace a job, rejecting jobs that end before they start
    pub fn add_job(&mut self, job: JobRecord) -> Result<()> {
        job.validate()?;
        match self.jobs.iter_mut().find(|existing| existing.job_id == job.job_id) {
            Some(existing) => *existing = job,
            None => self.jobs.push(job),
        }
        Ok(())
    }

    /// Number of cost, usage, and job records held
    pub fn record_counts(&self) -> (usize, usize, usize) {
        (self.costs.len(), self.usage.len(), self.jobs.len())
    }

    fn daily_series(records: impl Iterator<Item = (NaiveDate, f64)>) -> Vec<DailyValue> {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (date, value) in records {
            *by_date.entry(date).or_insert(0.0) += value;
        }
        by_date
            .into_iter()
            .map(|(date, value)| DailyValue::new(date, value))
            .collect()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn cost_by_gpu(&self, range: &DateRange) -> Result<Vec<GpuCostRow>> {
        let mut pools: BTreeMap<(Provider, GpuType), (f64, BTreeSet<NaiveDate>)> = BTreeMap::new();
        for record in self.costs.values().filter(|r| range.contains(r.date)) {
            let entry = pools
                .entry((record.provider.clone(), record.gpu_type.clone()))
                .or_insert_with(|| (0.0, BTreeSet::new()));
            entry.0 += record.cost_usd;
            entry.1.insert(record.date);
        }

        debug!("Aggregated cost for {} pools in {}", pools.len(), range);
        Ok(pools
            .into_iter()
            .map(|((provider, gpu_type), (total_cost, days))| GpuCostRow {
                provider,
                gpu_type,
                total_cost,
                days_count: days.len() as u32,
            })
            .collect())
    }

    async fn total_cost(&self, range: &DateRange) -> Result<f64> {
        Ok(self
            .costs
            .values()
            .filter(|r| range.contains(r.date))
            .map(|r| r.cost_usd)
            .sum())
    }

    async fn usage_hours(&self, range: &DateRange, filter: &SeriesFilter) -> Result<f64> {
        Ok(self
            .usage
            .values()
            .filter(|r| range.contains(r.date) && filter.matches(&r.provider, &r.gpu_type))
            .map(|r| r.gpu_hours)
            .sum())
    }

    async fn daily_cost_history(&self, filter: &SeriesFilter) -> Result<Vec<DailyValue>> {
        Ok(Self::daily_series(
            self.costs
                .values()
                .filter(|r| filter.matches(&r.provider, &r.gpu_type))
                .map(|r| (r.date, r.cost_usd)),
        ))
    }

    async fn daily_usage_history(&self, filter: &SeriesFilter) -> Result<Vec<DailyValue>> {
        Ok(Self::daily_series(
            self.usage
                .values()
                .filter(|r| filter.matches(&r.provider, &r.gpu_type))
                .map(|r| (r.date, r.gpu_hours)),
        ))
    }

    async fn jobs_started_in(&self, range: &DateRange, query: &JobQuery) -> Result<Vec<JobRow>> {
        Ok(self
            .jobs
            .iter()
            .filter(|job| query.start_date(job).is_some_and(|d| range.contains(d)))
            .filter(|job| query.matches(job))
            .filter_map(|job| {
                self.teams.get(&job.team_id).map(|team| JobRow {
                    job: job.clone(),
                    team_name: team.name.clone(),
                })
            })
            .collect())
    }
}
