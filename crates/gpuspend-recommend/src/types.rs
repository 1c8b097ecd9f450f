//! Recommendation data model
//!
//! Recommendations are generated fresh on every request and never persisted.
//! Each one carries typed evidence describing the measurement that triggered
//! it.

use chrono::{DateTime, NaiveDate, Utc};
use gpuspend_core::types::{DateRange, GpuType, Provider, round2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Coarse ranking attached to every recommendation
///
/// Ordering follows rank: `Low < Medium < High`.
///
/// # Examples
/// ```
/// use gpuspend_recommend::types::Severity;
///
/// assert!(Severity::High > Severity::Medium);
/// assert_eq!(Severity::Medium.rank(), 2);
/// assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Numeric rank used by the minimum-severity filter (low=1, medium=2, high=3)
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid severity: {s}")),
        }
    }
}

/// Kind of optimization a recommendation proposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    IdleGpu,
    LongRunningJob,
    OffHoursUsage,
    /// Reserved for rules outside the built-in set
    CostOptimization,
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdleGpu => write!(f, "idle_gpu"),
            Self::LongRunningJob => write!(f, "long_running_job"),
            Self::OffHoursUsage => write!(f, "off_hours_usage"),
            Self::CostOptimization => write!(f, "cost_optimization"),
        }
    }
}

impl std::str::FromStr for RecommendationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "idle_gpu" => Ok(Self::IdleGpu),
            "long_running_job" => Ok(Self::LongRunningJob),
            "off_hours_usage" => Ok(Self::OffHoursUsage),
            "cost_optimization" => Ok(Self::CostOptimization),
            _ => Err(format!("Invalid recommendation type: {s}")),
        }
    }
}

/// Structured rationale behind a recommendation, one shape per rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// Paid capacity compared with measured usage for one pool
    IdleGpu {
        date_range: DateRange,
        total_cost_usd: f64,
        expected_usage_hours: f64,
        actual_usage_hours: f64,
        waste_percentage: f64,
        gpu_type: GpuType,
        provider: Provider,
    },
    /// A single completed job over the runtime threshold
    LongRunningJob {
        date_range: DateRange,
        job_id: String,
        job_runtime_hours: f64,
        job_start_time: DateTime<Utc>,
        job_end_time: DateTime<Utc>,
        gpu_type: GpuType,
        provider: Provider,
        team_name: String,
        model_name: String,
    },
    /// A team's jobs started inside business hours
    OffHoursUsage {
        date_range: DateRange,
        team_name: String,
        business_hours_job_count: usize,
        total_runtime_hours: f64,
    },
}

/// A single cost optimization recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Per-call identifier
    pub id: Uuid,
    /// Kind of recommendation
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    /// Short title
    pub title: String,
    /// Human-readable explanation
    pub description: String,
    /// Severity derived from the rule's magnitude measure
    pub severity: Severity,
    /// Estimated savings if acted upon (USD, never negative)
    pub estimated_savings_usd: f64,
    /// Measurement that triggered the recommendation
    pub evidence: Evidence,
    /// When the recommendation was generated
    pub created_at: DateTime<Utc>,
}

/// Request filters for recommendation generation
///
/// # Examples
/// ```
/// use gpuspend_recommend::types::{RecommendationFilters, RecommendationType, Severity};
/// use chrono::NaiveDate;
///
/// let filters = RecommendationFilters::new(
///     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
/// )
/// .with_min_severity(Severity::High)
/// .with_types(vec![RecommendationType::IdleGpu]);
/// assert_eq!(filters.min_severity, Some(Severity::High));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationFilters {
    /// First day analysed (inclusive)
    pub start_date: NaiveDate,
    /// Last day analysed (inclusive)
    pub end_date: NaiveDate,
    /// Keep only recommendations at or above this severity
    pub min_severity: Option<Severity>,
    /// Keep only these recommendation types
    pub types: Option<Vec<RecommendationType>>,
    /// Restrict job-based rules to one team
    pub team_id: Option<Uuid>,
    /// Keep only recommendations saving at least this much (USD)
    pub min_savings: Option<f64>,
}

impl RecommendationFilters {
    /// Filters covering a date range with no further restrictions
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            min_severity: None,
            types: None,
            team_id: None,
            min_savings: None,
        }
    }

    /// Filters covering an existing range
    pub fn for_range(range: &DateRange) -> Self {
        Self::new(range.start_date, range.end_date)
    }

    /// Set the minimum severity
    pub fn with_min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Set the accepted recommendation types
    pub fn with_types(mut self, types: Vec<RecommendationType>) -> Self {
        self.types = Some(types);
        self
    }

    /// Restrict to one team
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Set the minimum savings threshold
    pub fn with_min_savings(mut self, min_savings: f64) -> Self {
        self.min_savings = Some(min_savings);
        self
    }

    /// Check whether a recommendation passes every post-generation filter
    pub fn accepts(&self, recommendation: &Recommendation) -> bool {
        if let Some(min) = self.min_severity {
            if recommendation.severity.rank() < min.rank() {
                return false;
            }
        }
        if let Some(types) = &self.types {
            if !types.is_empty() && !types.contains(&recommendation.kind) {
                return false;
            }
        }
        if let Some(min_savings) = self.min_savings {
            if recommendation.estimated_savings_usd < min_savings {
                return false;
            }
        }
        true
    }
}

/// Counts over the filtered recommendation set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSummary {
    /// Number of recommendations returned
    pub total: usize,
    /// Count per severity
    pub by_severity: BTreeMap<Severity, usize>,
    /// Count per recommendation type
    pub by_type: BTreeMap<RecommendationType, usize>,
    /// Set when generation failed at the top level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecommendationSummary {
    /// Summarise a recommendation list
    pub fn from_recommendations(recommendations: &[Recommendation]) -> Self {
        let mut summary = Self {
            total: recommendations.len(),
            ..Self::default()
        };
        for recommendation in recommendations {
            *summary.by_severity.entry(recommendation.severity).or_insert(0) += 1;
            *summary.by_type.entry(recommendation.kind).or_insert(0) += 1;
        }
        summary
    }

    /// Summary for a failed generation
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Recommendation generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    /// Filtered recommendations
    pub recommendations: Vec<Recommendation>,
    /// Counts over the filtered set
    pub summary: RecommendationSummary,
    /// Range analysed
    pub date_range: DateRange,
    /// Sum of savings over the filtered set
    pub total_estimated_savings_usd: f64,
}

impl RecommendationResponse {
    /// Response over `recommendations` with the summary and savings total derived from them
    pub fn new(recommendations: Vec<Recommendation>, date_range: DateRange) -> Self {
        let total_estimated_savings_usd =
            round2(recommendations.iter().map(|r| r.estimated_savings_usd).sum::<f64>());
        Self {
            summary: RecommendationSummary::from_recommendations(&recommendations),
            recommendations,
            date_range,
            total_estimated_savings_usd,
        }
    }

    /// Empty response carrying an error in its summary
    pub fn failed(filters: &RecommendationFilters, error: impl Into<String>) -> Self {
        Self {
            recommendations: Vec::new(),
            summary: RecommendationSummary::failed(error),
            date_range: DateRange {
                start_date: filters.start_date,
                end_date: filters.end_date,
            },
            total_estimated_savings_usd: 0.0,
        }
    }

    /// Recommendations ordered by estimated savings, highest first
    pub fn top_by_savings(&self, limit: usize) -> Vec<&Recommendation> {
        let mut sorted: Vec<&Recommendation> = self.recommendations.iter().collect();
        sorted.sort_by(|a, b| b.estimated_savings_usd.total_cmp(&a.estimated_savings_usd));
        sorted.truncate(limit);
        sorted
    }

    /// Keep only the `limit` largest-savings recommendations
    ///
    /// The summary and savings total are recomputed over what is kept. A failed
    /// response is returned unchanged.
    pub fn into_top(self, limit: usize) -> Self {
        if self.summary.error.is_some() {
            return self;
        }
        let kept = self.top_by_savings(limit).into_iter().cloned().collect();
        Self::new(kept, self.date_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recommendation(kind: RecommendationType, severity: Severity, savings: f64) -> Recommendation {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        Recommendation {
            id: Uuid::new_v4(),
            kind,
            title: "t".to_string(),
            description: "d".to_string(),
            severity,
            estimated_savings_usd: savings,
            evidence: Evidence::OffHoursUsage {
                date_range: DateRange::single(day),
                team_name: "ml".to_string(),
                business_hours_job_count: 3,
                total_runtime_hours: 1.0,
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_severity_parsing_and_rank() {
        assert_eq!("low".parse::<Severity>().unwrap(), Severity::Low);
        assert!("critical".parse::<Severity>().is_err());
        assert!(Severity::Low.rank() < Severity::High.rank());
    }

    #[test]
    fn test_type_serializes_snake_case() {
        let json = serde_json::to_string(&RecommendationType::LongRunningJob).unwrap();
        assert_eq!(json, "\"long_running_job\"");
        assert_eq!(
            "idle-gpu".parse::<RecommendationType>().unwrap(),
            RecommendationType::IdleGpu
        );
    }

    #[test]
    fn test_filters_accept() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let rec = recommendation(RecommendationType::IdleGpu, Severity::Medium, 50.0);

        assert!(RecommendationFilters::new(day, day).accepts(&rec));
        assert!(
            !RecommendationFilters::new(day, day)
                .with_min_severity(Severity::High)
                .accepts(&rec)
        );
        assert!(
            !RecommendationFilters::new(day, day)
                .with_types(vec![RecommendationType::OffHoursUsage])
                .accepts(&rec)
        );
        assert!(
            RecommendationFilters::new(day, day)
                .with_min_savings(50.0)
                .accepts(&rec)
        );
        assert!(
            !RecommendationFilters::new(day, day)
                .with_min_savings(50.01)
                .accepts(&rec)
        );
    }

    #[test]
    fn test_summary_counts() {
        let recs = vec![
            recommendation(RecommendationType::IdleGpu, Severity::High, 1.0),
            recommendation(RecommendationType::IdleGpu, Severity::Low, 1.0),
            recommendation(RecommendationType::OffHoursUsage, Severity::Low, 1.0),
        ];
        let summary = RecommendationSummary::from_recommendations(&recs);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_severity[&Severity::Low], 2);
        assert_eq!(summary.by_type[&RecommendationType::IdleGpu], 2);
        assert!(summary.error.is_none());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["by_severity"]["low"], 2);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_top_by_savings() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let response = RecommendationResponse {
            recommendations: vec![
                recommendation(RecommendationType::IdleGpu, Severity::High, 10.0),
                recommendation(RecommendationType::IdleGpu, Severity::High, 30.0),
                recommendation(RecommendationType::IdleGpu, Severity::High, 20.0),
            ],
            summary: RecommendationSummary::default(),
            date_range: DateRange::single(day),
            total_estimated_savings_usd: 60.0,
        };
        let top: Vec<f64> = response
            .top_by_savings(2)
            .iter()
            .map(|r| r.estimated_savings_usd)
            .collect();
        assert_eq!(top, vec![30.0, 20.0]);
    }

    #[test]
    fn test_into_top_recomputes_summary_and_savings() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let response = RecommendationResponse::new(
            vec![
                recommendation(RecommendationType::IdleGpu, Severity::Low, 10.25),
                recommendation(RecommendationType::LongRunningJob, Severity::High, 30.5),
                recommendation(RecommendationType::IdleGpu, Severity::Medium, 20.0),
            ],
            DateRange::single(day),
        );
        assert_eq!(response.summary.total, 3);
        assert_eq!(response.total_estimated_savings_usd, 60.75);

        let top = response.into_top(1);
        assert_eq!(top.recommendations.len(), 1);
        assert_eq!(top.summary.total, 1);
        assert_eq!(top.summary.by_type[&RecommendationType::LongRunningJob], 1);
        assert!(!top.summary.by_type.contains_key(&RecommendationType::IdleGpu));
        assert_eq!(top.total_estimated_savings_usd, 30.5);
    }

    #[test]
    fn test_into_top_keeps_failed_response() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let failed = RecommendationResponse::failed(
            &RecommendationFilters::new(day, day),
            "boom",
        )
        .into_top(5);
        assert_eq!(failed.summary.error.as_deref(), Some("boom"));
        assert!(failed.recommendations.is_empty());
    }
}
