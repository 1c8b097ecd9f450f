//! gpuspend - GPU cloud spend analytics over a dataset snapshot
//!
//! This library backs the `gpuspend` binary:
//! - Load a JSON snapshot of cost, usage and job records into a repository
//! - Map CLI flags and environment variables onto the analytics configuration
//! - Render recommendations, forecasts, digests and alerts as tables or JSON
//!
//! The analyses themselves live in the `gpuspend-recommend`,
//! `gpuspend-forecast` and `gpuspend-digest` crates.
//!
//! # Examples
//!
//! ```no_run
//! use gpuspend::dataset::Dataset;
//! use gpuspend_core::AnalyticsConfig;
//! use gpuspend_digest::DigestGenerator;
//! use chrono::NaiveDate;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let repo = Dataset::load(Path::new("spend.json")).await?.into_repository(false)?;
//!     let digest = DigestGenerator::new(Arc::new(repo), AnalyticsConfig::default())
//!         .generate(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap())
//!         .await?;
//!     println!("{}", digest.total_daily_cost);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod dataset;
pub mod output;

pub use dataset::Dataset;
pub use output::{AlertReport, OutputFormatter, get_formatter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
