//! Dataset snapshot loading
//!
//! The CLI works on a JSON snapshot of the time-series store:
//!
//! ```json
//! {
//!   "teams": [{ "id": "…", "name": "ml-research" }],
//!   "costs": [{ "date": "2026-01-01", "provider": "aws", "gpu_type": "h100", "cost_usd": 84.0 }],
//!   "usage": [{ "date": "2026-01-01", "provider": "aws", "gpu_type": "h100", "gpu_hours": 20.0 }],
//!   "jobs":  [{ "job_id": "j-1", "team_id": "…", "model_name": "llama", "gpu_type": "h100",
//!              "provider": "aws", "start_time": "2026-01-01T10:00:00Z",
//!              "end_time": "2026-01-02T12:00:00Z", "status": "completed" }]
//! }
//! ```
//!
//! Every section is optional. Records are validated with the same rules the
//! core constructors enforce before they reach the repository.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use gpuspend_core::types::{CostRecord, DateRange, JobRecord, Team, UsageRecord};
use gpuspend_core::usage::derive_usage_records;
use gpuspend_core::{MemoryRepository, SpendError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Contents of a snapshot file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub costs: Vec<CostRecord>,
    #[serde(default)]
    pub usage: Vec<UsageRecord>,
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
}

impl Dataset {
    /// Parse snapshot JSON
    pub fn parse(content: &str) -> gpuspend_core::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a snapshot file
    ///
    /// The underlying [`SpendError`] stays reachable through `downcast_ref`.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(SpendError::Io)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        let dataset = Self::parse(&content)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
        info!(
            "Loaded dataset {}: {} teams, {} cost, {} usage, {} job records",
            path.display(),
            dataset.teams.len(),
            dataset.costs.len(),
            dataset.usage.len(),
            dataset.jobs.len()
        );
        Ok(dataset)
    }

    /// Days spanned by the job records, if any job has both a start and an end
    pub fn job_span(&self) -> Option<DateRange> {
        let starts = self.jobs.iter().filter_map(|j| j.start_time);
        let ends = self.jobs.iter().filter_map(|j| j.end_time);
        let first: NaiveDate = starts.min()?.date_naive();
        let last: NaiveDate = ends.max()?.date_naive();
        DateRange::new(first, last.max(first)).ok()
    }

    /// Build a repository from the snapshot
    ///
    /// With `derive_usage`, usage records are computed from job spans and the
    /// snapshot's own usage section is ignored.
    pub fn into_repository(self, derive_usage: bool) -> Result<MemoryRepository> {
        let mut repo = MemoryRepository::new();

        let usage = if derive_usage {
            if !self.usage.is_empty() {
                warn!(
                    "Ignoring {} usage records in favour of job-derived usage",
                    self.usage.len()
                );
            }
            let derived = self
                .job_span()
                .map(|span| derive_usage_records(&self.jobs, &span))
                .unwrap_or_default();
            debug!("Derived {} usage records from jobs", derived.len());
            derived
        } else {
            self.usage
        };

        for team in self.teams {
            repo.add_team(team);
        }
        for record in self.costs {
            let record = CostRecord::new(
                record.date,
                record.provider,
                record.gpu_type,
                record.cost_usd,
            )
            .with_context(|| format!("Invalid cost record for {}", record.date))?;
            repo.add_cost(record);
        }
        for record in usage {
            let record = UsageRecord::new(
                record.date,
                record.provider,
                record.gpu_type,
                record.gpu_hours,
            )
            .with_context(|| format!("Invalid usage record for {}", record.date))?;
            repo.add_usage(record);
        }
        for job in self.jobs {
            let job_id = job.job_id.clone();
            repo.add_job(job)
                .with_context(|| format!("Invalid job {job_id}"))?;
        }

        let (costs, usage, jobs) = repo.record_counts();
        debug!(
            "Repository holds {} cost, {} usage, {} job records",
            costs, usage, jobs
        );
        Ok(repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gpuspend_core::types::{JobStatus, Provider};
    use gpuspend_core::{Repository, SeriesFilter};
    use std::io::Write;
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_load_minimal_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"costs": [{{"date": "2026-01-01", "provider": "AWS", "gpu_type": "H100", "cost_usd": 84.0}}]}}"#
        )
        .unwrap();

        let dataset = Dataset::load(file.path()).await.unwrap();
        assert_eq!(dataset.costs.len(), 1);
        assert_eq!(dataset.costs[0].provider, Provider::new("aws"));
        assert!(dataset.jobs.is_empty());

        let repo = dataset.into_repository(false).unwrap();
        assert_eq!(repo.record_counts(), (1, 0, 0));
    }

    #[tokio::test]
    async fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::load(&dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read dataset"));
        assert!(matches!(err.downcast_ref::<SpendError>(), Some(SpendError::Io(_))));
    }

    #[test]
    fn test_parse_error_is_json_error() {
        assert!(matches!(
            Dataset::parse("{\"teams\": 42}"),
            Err(SpendError::Json(_))
        ));
        assert_eq!(Dataset::parse("{}").unwrap(), Dataset::default());
    }

    #[test]
    fn test_rejects_non_positive_cost() {
        let dataset: Dataset = serde_json::from_str(
            r#"{"costs": [{"date": "2026-01-01", "provider": "aws", "gpu_type": "h100", "cost_usd": 0.0}]}"#,
        )
        .unwrap();
        assert!(dataset.into_repository(false).is_err());
    }

    #[tokio::test]
    async fn test_derive_usage_from_jobs() {
        let team = Team {
            id: Uuid::new_v4(),
            name: "research".to_string(),
        };
        let job = JobRecord {
            job_id: "j-1".to_string(),
            team_id: team.id,
            model_name: "llama".to_string(),
            gpu_type: "h100".into(),
            provider: "aws".into(),
            start_time: Some(Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()),
            end_time: Some(Utc.with_ymd_and_hms(2026, 1, 2, 6, 0, 0).unwrap()),
            status: JobStatus::Completed,
        };
        let dataset = Dataset {
            teams: vec![team],
            usage: vec![UsageRecord::new(day(1), "aws", "h100", 100.0).unwrap()],
            jobs: vec![job],
            ..Dataset::default()
        };
        assert_eq!(dataset.job_span(), Some(DateRange::new(day(1), day(2)).unwrap()));

        let repo = dataset.into_repository(true).unwrap();
        let hours = repo
            .usage_hours(&DateRange::new(day(1), day(2)).unwrap(), &SeriesFilter::new())
            .await
            .unwrap();
        assert_eq!(hours, 18.0);
    }
}
