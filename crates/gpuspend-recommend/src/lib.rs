//! Rules-based cost optimization recommendations
//!
//! The [`RecommendationEngine`] evaluates three independent detection rules
//! (idle GPU pools, long-running jobs, business-hours scheduling) against the
//! cost, usage, and job history exposed by a
//! [`Repository`](gpuspend_core::Repository), then filters and summarises the
//! result.
//!
//! # Examples
//!
//! ```
//! use gpuspend_core::{AnalyticsConfig, MemoryRepository, CostRecord};
//! use gpuspend_recommend::{RecommendationEngine, RecommendationFilters};
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn example() -> gpuspend_core::Result<()> {
//! let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
//!
//! let mut repo = MemoryRepository::new();
//! for day in start.iter_days().take(14) {
//!     repo.add_cost(CostRecord::new(day, "aws", "a100", 84.0)?);
//! }
//!
//! let engine = RecommendationEngine::new(Arc::new(repo), AnalyticsConfig::default());
//! let response = engine.generate(&RecommendationFilters::new(start, end)).await;
//! assert_eq!(response.total_estimated_savings_usd, 1176.0);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod rules;
pub mod types;

pub use engine::RecommendationEngine;
pub use rules::Rule;
pub use types::{
    Evidence, Recommendation, RecommendationFilters, RecommendationResponse,
    RecommendationSummary, RecommendationType, Severity,
};
