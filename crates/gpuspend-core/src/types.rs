//! Core domain types for gpuspend
//!
//! This module contains the record types the analytics core reads from the
//! time-series repository: daily cost and usage records per
//! (provider, GPU type) and individual job executions. Provider and GPU type
//! names are normalized on construction so every comparison downstream is
//! case-insensitive.

use crate::error::{Result, SpendError};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Round a monetary or hour value to two decimal places
///
/// # Examples
/// ```
/// use gpuspend_core::types::round2;
///
/// assert_eq!(round2(1176.004), 1176.0);
/// assert_eq!(round2(12.345_6), 12.35);
/// ```
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

macro_rules! normalized_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a new name, trimmed and lowercased
            pub fn new(name: impl AsRef<str>) -> Self {
                Self(name.as_ref().trim().to_lowercase())
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

normalized_name!(
    /// Cloud provider name, canonical lowercase
    ///
    /// # Examples
    /// ```
    /// use gpuspend_core::types::Provider;
    ///
    /// assert_eq!(Provider::new(" AWS ").as_str(), "aws");
    /// assert_eq!(Provider::new("aws"), Provider::new("Aws"));
    /// ```
    Provider
);

normalized_name!(
    /// GPU type name, canonical lowercase
    ///
    /// # Examples
    /// ```
    /// use gpuspend_core::types::GpuType;
    ///
    /// assert_eq!(GpuType::new("H100").as_str(), "h100");
    /// ```
    GpuType
);

/// Inclusive calendar date range
///
/// Every repository query in gpuspend is bounded by one of these; both ends
/// are included.
///
/// # Examples
/// ```
/// use gpuspend_core::types::DateRange;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
/// let range = DateRange::new(start, end).unwrap();
///
/// assert_eq!(range.num_days(), 14);
/// assert!(range.contains(end));
/// assert!(DateRange::new(end, start).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First day of the range
    pub start_date: NaiveDate,
    /// Last day of the range
    pub end_date: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting a start date after the end date
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if start_date > end_date {
            return Err(SpendError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Single-day range
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start_date: date,
            end_date: date,
        }
    }

    /// Range of `days` days ending at (and including) `end_date`
    ///
    /// `days` is clamped to at least one.
    pub fn trailing(end_date: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start_date: end_date - Duration::days(span),
            end_date,
        }
    }

    /// Whether the date falls inside the range
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Number of calendar days covered
    pub fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// Iterate over every day in the range
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |day| *day <= self.end_date)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_date, self.end_date)
    }
}

/// Aggregate daily spend for one (provider, GPU type) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    /// Day the spend applies to
    pub date: NaiveDate,
    /// Cloud provider
    pub provider: Provider,
    /// GPU type
    pub gpu_type: GpuType,
    /// Spend in USD, rounded to cents
    pub cost_usd: f64,
}

impl CostRecord {
    /// Create a cost record; the amount is rounded to cents and must be positive
    pub fn new(
        date: NaiveDate,
        provider: impl Into<Provider>,
        gpu_type: impl Into<GpuType>,
        cost_usd: f64,
    ) -> Result<Self> {
        if !cost_usd.is_finite() || cost_usd <= 0.0 {
            return Err(SpendError::InvalidArgument(format!(
                "cost_usd must be positive, got {cost_usd}"
            )));
        }
        Ok(Self {
            date,
            provider: provider.into(),
            gpu_type: gpu_type.into(),
            cost_usd: round2(cost_usd),
        })
    }
}

/// Measured GPU hours for one (provider, GPU type) pair on one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Day the usage applies to
    pub date: NaiveDate,
    /// Cloud provider
    pub provider: Provider,
    /// GPU type
    pub gpu_type: GpuType,
    /// GPU hours consumed
    pub gpu_hours: f64,
}

impl UsageRecord {
    /// Create a usage record; hours must be non-negative
    pub fn new(
        date: NaiveDate,
        provider: impl Into<Provider>,
        gpu_type: impl Into<GpuType>,
        gpu_hours: f64,
    ) -> Result<Self> {
        if !gpu_hours.is_finite() || gpu_hours < 0.0 {
            return Err(SpendError::InvalidArgument(format!(
                "gpu_hours must be non-negative, got {gpu_hours}"
            )));
        }
        Ok(Self {
            date,
            provider: provider.into(),
            gpu_type: gpu_type.into(),
            gpu_hours,
        })
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

/// A team that owns jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Team identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
}

/// One execution of a training or inference job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique external job identifier
    pub job_id: String,
    /// Owning team
    pub team_id: Uuid,
    /// Model being trained or served
    pub model_name: String,
    /// GPU type the job ran on
    pub gpu_type: GpuType,
    /// Cloud provider the job ran on
    pub provider: Provider,
    /// When the job started, if it has
    pub start_time: Option<DateTime<Utc>>,
    /// When the job ended, if it has
    pub end_time: Option<DateTime<Utc>>,
    /// Lifecycle state
    pub status: JobStatus,
}

impl JobRecord {
    /// Check that the end time, when present, does not precede the start time
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if end < start {
                return Err(SpendError::InvalidArgument(format!(
                    "job {} ends before it starts",
                    self.job_id
                )));
            }
        }
        Ok(())
    }

    /// Calendar (UTC) day the job started on
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_time.map(|ts| ts.date_naive())
    }

    /// Wall-clock runtime in hours, if the job has both a start and an end
    pub fn runtime_hours(&self) -> Option<f64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(hours_between(start, end)),
            _ => None,
        }
    }
}

/// Fractional hours between two instants
pub fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 3_600_000.0
}

/// A single (date, value) observation in a daily series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    /// Calendar day
    pub date: NaiveDate,
    /// Summed value for the day
    pub value: f64,
}

impl DailyValue {
    /// Create a new observation
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}
