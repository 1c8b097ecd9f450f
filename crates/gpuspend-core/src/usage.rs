//! Usage derivation from job spans
//!
//! Usage records are populated independently of cost records. When no metered
//! usage is available, they are derived from job executions: a job contributes
//! the part of its span that overlaps each calendar day (UTC) to that day's
//! (provider, GPU type) total.

use crate::types::{DateRange, GpuType, JobRecord, Provider, UsageRecord, hours_between, round2};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use tracing::debug;

fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1))
}

/// Derive daily usage records from job spans
///
/// Jobs without both a start and an end time are skipped. Hours are summed per
/// (date, provider, GPU type) and rounded to two decimals; days with no
/// positive overlap produce no record.
///
/// # Examples
/// ```
/// use gpuspend_core::types::{DateRange, GpuType, JobRecord, JobStatus, Provider};
/// use gpuspend_core::usage::derive_usage_records;
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use uuid::Uuid;
///
/// let job = JobRecord {
///     job_id: "job-1".into(),
///     team_id: Uuid::new_v4(),
///     model_name: "llama".into(),
///     gpu_type: GpuType::new("h100"),
///     provider: Provider::new("aws"),
///     start_time: Some(Utc.with_ymd_and_hms(2026, 1, 1, 18, 0, 0).unwrap()),
///     end_time: Some(Utc.with_ymd_and_hms(2026, 1, 2, 6, 0, 0).unwrap()),
///     status: JobStatus::Completed,
/// };
/// let range = DateRange::new(
///     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
/// ).unwrap();
///
/// let records = derive_usage_records(&[job], &range);
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].gpu_hours, 6.0);
/// assert_eq!(records[1].gpu_hours, 6.0);
/// ```
pub fn derive_usage_records(jobs: &[JobRecord], range: &DateRange) -> Vec<UsageRecord> {
    let mut totals: BTreeMap<(NaiveDate, Provider, GpuType), f64> = BTreeMap::new();

    for job in jobs {
        let (Some(start), Some(end)) = (job.start_time, job.end_time) else {
            continue;
        };
        if end <= start {
            continue;
        }

        let first = start.date_naive().max(range.start_date);
        let last = end.date_naive().min(range.end_date);
        if first > last {
            continue;
        }

        for day in first.iter_days().take_while(|d| *d <= last) {
            let (day_start, day_end) = day_bounds(day);
            let overlap_start = start.max(day_start);
            let overlap_end = end.min(day_end);
            if overlap_end <= overlap_start {
                continue;
            }
            *totals
                .entry((day, job.provider.clone(), job.gpu_type.clone()))
                .or_insert(0.0) += hours_between(overlap_start, overlap_end);
        }
    }

    debug!("Derived {} usage records from {} jobs", totals.len(), jobs.len());

    totals
        .into_iter()
        .filter(|(_, hours)| *hours > 0.0)
        .map(|((date, provider, gpu_type), hours)| UsageRecord {
            date,
            provider,
            gpu_type,
            gpu_hours: round2(hours),
        })
        .collect()
}
