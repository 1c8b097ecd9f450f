//! Core types, traits, and utilities for gpuspend
//!
//! This crate provides the record types, the time-series repository trait,
//! error handling, and configuration shared by the recommendation engine, the
//! forecasting service, and the digest generator.

pub mod config;
pub mod error;
pub mod repository;
pub mod timezone;
pub mod types;
pub mod usage;

// Re-export commonly used types
pub use config::AnalyticsConfig;
pub use error::{Result, SpendError};
pub use repository::{MemoryRepository, Repository, SeriesFilter};
pub use types::{
    CostRecord, DailyValue, DateRange, GpuType, JobRecord, JobStatus, Provider, Team, UsageRecord,
};
