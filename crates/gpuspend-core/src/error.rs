//! Error types for gpuspend
//!
//! This module defines the error types used throughout the gpuspend crates.
//! All errors are derived from `thiserror` for convenient error handling
//! and automatic `From` implementations.
//!
//! The analytics core treats most of these as degraded conditions rather than
//! failures: repository and cache errors are logged and absorbed by the
//! recommendation engine and the forecasting service. They only reach callers
//! through the repository/cache traits themselves and the CLI.
//!
//! # Example
//!
//! ```
//! use gpuspend_core::error::{SpendError, Result};
//!
//! fn example_function() -> Result<()> {
//!     // This will automatically convert io::Error to SpendError
//!     let _file = std::fs::read_to_string("nonexistent.json")?;
//!     Ok(())
//! }
//! ```

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for gpuspend operations
#[derive(Error, Debug)]
pub enum SpendError {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid date format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Start date lies after end date
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Requested start date
        start: NaiveDate,
        /// Requested end date
        end: NaiveDate,
    },

    /// Invalid timezone
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Time-series repository failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// Forecast cache failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results in gpuspend
///
/// # Example
///
/// ```
/// use gpuspend_core::Result;
///
/// fn process_data() -> Result<String> {
///     Ok("Processed successfully".to_string())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SpendError>;
