//! Detection rules
//!
//! Each rule is a pure function from typed rows to recommendations. The engine
//! fetches the rows a rule needs and runs the rules in [`Rule::ALL`] order, so
//! a failure while fetching one rule's input never affects another rule.

use crate::types::{Evidence, Recommendation, RecommendationType, Severity};
use chrono::{DateTime, Utc, Weekday};
use gpuspend_core::AnalyticsConfig;
use gpuspend_core::repository::{GpuCostRow, JobRow};
use gpuspend_core::types::{DateRange, GpuType, JobStatus, Provider, round2};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Hours a pool is assumed available per day it has a cost record
pub const HOURS_PER_DAY: f64 = 24.0;

/// Spend and measured usage for one pool over the analysed range
#[derive(Debug, Clone, PartialEq)]
pub struct PoolUtilization {
    pub provider: Provider,
    pub gpu_type: GpuType,
    pub total_cost: f64,
    pub days_count: u32,
    pub actual_usage_hours: f64,
}

impl PoolUtilization {
    /// Pair a cost row with the usage measured for the same pool
    pub fn new(row: GpuCostRow, actual_usage_hours: f64) -> Self {
        Self {
            provider: row.provider,
            gpu_type: row.gpu_type,
            total_cost: row.total_cost,
            days_count: row.days_count,
            actual_usage_hours,
        }
    }

    /// Hours paid for, assuming continuous availability
    pub fn expected_hours(&self) -> f64 {
        f64::from(self.days_count) * HOURS_PER_DAY
    }

    /// Measured usage as a percentage of paid hours, `None` when nothing was paid for
    pub fn utilization_pct(&self) -> Option<f64> {
        let expected = self.expected_hours();
        (expected > 0.0).then(|| self.actual_usage_hours / expected * 100.0)
    }
}

/// The built-in detection rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    IdleGpu,
    LongRunningJob,
    OffHoursUsage,
}

impl Rule {
    /// Evaluation order
    pub const ALL: [Rule; 3] = [Rule::IdleGpu, Rule::LongRunningJob, Rule::OffHoursUsage];

    /// Recommendation type the rule emits
    pub fn kind(&self) -> RecommendationType {
        match self {
            Self::IdleGpu => RecommendationType::IdleGpu,
            Self::LongRunningJob => RecommendationType::LongRunningJob,
            Self::OffHoursUsage => RecommendationType::OffHoursUsage,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind().fmt(f)
    }
}

/// Severity of an idle pool from its waste percentage
pub fn severity_for_waste(waste_pct: f64) -> Severity {
    if waste_pct >= 70.0 {
        Severity::High
    } else if waste_pct >= 50.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Severity of a long job from its runtime
pub fn severity_for_runtime(runtime_hours: f64) -> Severity {
    if runtime_hours >= 72.0 {
        Severity::High
    } else if runtime_hours >= 48.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn recommendation(
    kind: RecommendationType,
    title: String,
    description: String,
    severity: Severity,
    savings: f64,
    evidence: Evidence,
    created_at: DateTime<Utc>,
) -> Recommendation {
    Recommendation {
        id: Uuid::new_v4(),
        kind,
        title,
        description,
        severity,
        estimated_savings_usd: round2(savings.max(0.0)),
        evidence,
        created_at,
    }
}

/// Flag pools whose utilization falls below the idle threshold
pub fn idle_gpu(
    range: &DateRange,
    pools: &[PoolUtilization],
    config: &AnalyticsConfig,
    created_at: DateTime<Utc>,
) -> Vec<Recommendation> {
    pools
        .iter()
        .filter_map(|pool| {
            let utilization = pool.utilization_pct()?;
            if utilization >= config.idle_utilization_threshold_pct {
                return None;
            }

            let expected = pool.expected_hours();
            let waste_pct = 100.0 - utilization;
            let savings = (expected - pool.actual_usage_hours) * config.hourly_gpu_rate;
            let gpu = pool.gpu_type.as_str().to_uppercase();
            let provider = pool.provider.as_str().to_uppercase();

            Some(recommendation(
                RecommendationType::IdleGpu,
                format!("Idle {gpu} GPUs on {provider}"),
                format!(
                    "Detected {waste_pct:.1}% idle GPU capacity on {provider} {gpu} instances. \
                     You're paying for {expected:.0} hours but only using {:.0} hours. \
                     Consider scaling down or right-sizing your GPU allocation.",
                    pool.actual_usage_hours
                ),
                severity_for_waste(waste_pct),
                savings,
                Evidence::IdleGpu {
                    date_range: *range,
                    total_cost_usd: round2(pool.total_cost),
                    expected_usage_hours: expected,
                    actual_usage_hours: pool.actual_usage_hours,
                    waste_percentage: round2(waste_pct),
                    gpu_type: pool.gpu_type.clone(),
                    provider: pool.provider.clone(),
                },
                created_at,
            ))
        })
        .collect()
}

/// Flag completed jobs that ran longer than the runtime threshold
pub fn long_running_jobs(
    range: &DateRange,
    jobs: &[JobRow],
    config: &AnalyticsConfig,
    created_at: DateTime<Utc>,
) -> Vec<Recommendation> {
    jobs.iter()
        .filter_map(|row| {
            let job = &row.job;
            if job.status != JobStatus::Completed {
                return None;
            }
            let (start, end) = (job.start_time?, job.end_time?);
            let runtime = job.runtime_hours()?;
            if runtime <= config.long_running_threshold_hours {
                return None;
            }

            let savings = runtime * config.long_running_reducible_fraction * config.hourly_gpu_rate;
            let reduction_pct = config.long_running_reducible_fraction * 100.0;

            Some(recommendation(
                RecommendationType::LongRunningJob,
                format!("Long-running job: {} ({})", job.model_name, row.team_name),
                format!(
                    "Job {} ran for {runtime:.1} hours, exceeding the {}h threshold. \
                     Consider optimizing the model training code, using distributed training, \
                     or right-sizing the GPU instance. A {reduction_pct:.0}% reduction could save \
                     approximately ${savings:.2}.",
                    job.job_id, config.long_running_threshold_hours
                ),
                severity_for_runtime(runtime),
                savings,
                Evidence::LongRunningJob {
                    date_range: *range,
                    job_id: job.job_id.clone(),
                    job_runtime_hours: round2(runtime),
                    job_start_time: start,
                    job_end_time: end,
                    gpu_type: job.gpu_type.clone(),
                    provider: job.provider.clone(),
                    team_name: row.team_name.clone(),
                    model_name: job.model_name.clone(),
                },
                created_at,
            ))
        })
        .collect()
}

/// Whether a job started on a weekday inside business hours
///
/// The weekday and clock time are read in the configured timezone. Weekend
/// starts are never business hours.
pub fn started_in_business_hours(start: DateTime<Utc>, config: &AnalyticsConfig) -> bool {
    let (weekday, time) = config.timezone.local_weekday_and_time(start);
    let is_weekday = !matches!(weekday, Weekday::Sat | Weekday::Sun);
    is_weekday && time >= config.business_hours_start && time < config.business_hours_end
}

/// Flag teams that start many jobs during business hours
///
/// Jobs are grouped by team name. A team needs at least
/// `off_hours_min_jobs` business-hours starts to be flagged.
pub fn off_hours_usage(
    range: &DateRange,
    jobs: &[JobRow],
    config: &AnalyticsConfig,
    created_at: DateTime<Utc>,
) -> Vec<Recommendation> {
    let mut by_team: BTreeMap<&str, Vec<&JobRow>> = BTreeMap::new();
    for row in jobs {
        let Some(start) = row.job.start_time else {
            continue;
        };
        if started_in_business_hours(start, config) {
            by_team.entry(row.team_name.as_str()).or_default().push(row);
        }
    }

    let window = format!(
        "{}-{}",
        config.business_hours_start.format("%H:%M"),
        config.business_hours_end.format("%H:%M")
    );

    by_team
        .into_iter()
        .filter(|(_, rows)| rows.len() >= config.off_hours_min_jobs)
        .map(|(team_name, rows)| {
            let total_runtime: f64 = rows.iter().filter_map(|r| r.job.runtime_hours()).sum();
            let savings = total_runtime * config.hourly_gpu_rate * config.off_peak_discount;

            recommendation(
                RecommendationType::OffHoursUsage,
                format!("Consider off-peak scheduling for {team_name}"),
                format!(
                    "Team '{team_name}' ran {} jobs during business hours ({window} weekdays). \
                     Consider scheduling non-urgent training jobs during off-peak hours \
                     (evenings/weekends) to potentially access discounted pricing or reserved \
                     capacity. This could save approximately ${savings:.2} through off-peak pricing.",
                    rows.len()
                ),
                Severity::Low,
                savings,
                Evidence::OffHoursUsage {
                    date_range: *range,
                    team_name: team_name.to_string(),
                    business_hours_job_count: rows.len(),
                    total_runtime_hours: round2(total_runtime),
                },
                created_at,
            )
        })
        .collect()
}
