//! Common test utilities and builders for gpuspend tests
//!
//! Dates default to January 2026. 2026-01-05 is a Monday.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use gpuspend_core::types::{CostRecord, JobRecord, JobStatus, Team, UsageRecord};
use gpuspend_core::{MemoryRepository, Repository};
use std::sync::Arc;
use uuid::Uuid;

/// Calendar day in January 2026
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).expect("valid January day")
}

/// UTC instant on a January 2026 day
pub fn at(d: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, d, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

/// Builder for creating test JobRecord instances
pub struct JobBuilder {
    job_id: String,
    team_id: Uuid,
    model_name: String,
    provider: String,
    gpu_type: String,
    start_time: Option<DateTime<Utc>>,
    runtime_hours: Option<f64>,
    status: JobStatus,
}

impl JobBuilder {
    /// A completed one-hour job on AWS H100 starting Monday 10:00
    pub fn new(team_id: Uuid) -> Self {
        Self {
            job_id: format!("job-{}", Uuid::new_v4()),
            team_id,
            model_name: "llama-3-8b".to_string(),
            provider: "aws".to_string(),
            gpu_type: "h100".to_string(),
            start_time: Some(at(5, 10, 0)),
            runtime_hours: Some(1.0),
            status: JobStatus::Completed,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.job_id = id.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model_name = model.to_string();
        self
    }

    pub fn on(mut self, provider: &str, gpu_type: &str) -> Self {
        self.provider = provider.to_string();
        self.gpu_type = gpu_type.to_string();
        self
    }

    pub fn starting(mut self, ts: DateTime<Utc>) -> Self {
        self.start_time = Some(ts);
        self
    }

    pub fn running_for(mut self, hours: f64) -> Self {
        self.runtime_hours = Some(hours);
        self
    }

    /// Job has started but not finished
    pub fn still_running(mut self) -> Self {
        self.runtime_hours = None;
        self.status = JobStatus::Running;
        self
    }

    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> JobRecord {
        let end_time = match (self.start_time, self.runtime_hours) {
            (Some(start), Some(hours)) => {
                Some(start + Duration::milliseconds((hours * 3_600_000.0).round() as i64))
            }
            _ => None,
        };
        JobRecord {
            job_id: self.job_id,
            team_id: self.team_id,
            model_name: self.model_name,
            gpu_type: self.gpu_type.as_str().into(),
            provider: self.provider.as_str().into(),
            start_time: self.start_time,
            end_time,
            status: self.status,
        }
    }
}

/// Fixture for assembling a repository
#[derive(Default)]
pub struct SpendFixture {
    repo: MemoryRepository,
}

impl SpendFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a team and return its id
    pub fn team(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.repo.add_team(Team {
            id,
            name: name.to_string(),
        });
        id
    }

    /// Same daily cost for a pool on every day in `days`
    pub fn daily_cost(
        &mut self,
        provider: &str,
        gpu_type: &str,
        days: impl IntoIterator<Item = u32>,
        cost: f64,
    ) -> &mut Self {
        for d in days {
            self.repo
                .add_cost(CostRecord::new(day(d), provider, gpu_type, cost).expect("valid cost"));
        }
        self
    }

    /// Same daily GPU hours for a pool on every day in `days`
    pub fn daily_usage(
        &mut self,
        provider: &str,
        gpu_type: &str,
        days: impl IntoIterator<Item = u32>,
        hours: f64,
    ) -> &mut Self {
        for d in days {
            self.repo.add_usage(
                UsageRecord::new(day(d), provider, gpu_type, hours).expect("valid usage"),
            );
        }
        self
    }

    /// One cost record per value, on consecutive days starting at `first`
    pub fn cost_series(&mut self, provider: &str, gpu_type: &str, first: NaiveDate, values: &[f64]) -> &mut Self {
        for (i, value) in values.iter().enumerate() {
            let date = first + Duration::days(i as i64);
            self.repo
                .add_cost(CostRecord::new(date, provider, gpu_type, *value).expect("valid cost"));
        }
        self
    }

    pub fn job(&mut self, job: JobRecord) -> &mut Self {
        self.repo.add_job(job).expect("valid job");
        self
    }

    pub fn build(self) -> Arc<dyn Repository> {
        Arc::new(self.repo)
    }
}

/// Upward-trending daily values with a small repeating wobble
pub fn trending_series(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 5.0 * i as f64 + [0.0, 3.0, -2.0][i % 3])
        .collect()
}
