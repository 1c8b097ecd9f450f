//! Timezone utilities for schedule classification
//!
//! Job timestamps are stored in UTC. Business-hours classification (weekday and
//! time of day) happens in the configured timezone, which defaults to UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

/// Configuration for timezone handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneConfig {
    /// The timezone to use for local-time classification
    pub tz: Tz,
    /// Whether the timezone is UTC
    pub is_utc: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            tz: Tz::UTC,
            is_utc: true,
        }
    }
}

impl TimezoneConfig {
    /// Create a new timezone configuration from CLI arguments
    pub fn from_cli(timezone_str: Option<&str>, use_utc: bool) -> crate::error::Result<Self> {
        if use_utc {
            return Ok(Self::default());
        }

        if let Some(tz_str) = timezone_str {
            let tz = Tz::from_str(tz_str).map_err(|_| {
                crate::error::SpendError::InvalidTimezone(format!(
                    "'{}'. Use format like 'America/New_York', 'Asia/Tokyo', or 'UTC'",
                    tz_str
                ))
            })?;
            debug!("Using timezone {} for schedule classification", tz_str);
            Ok(Self {
                tz,
                is_utc: tz == Tz::UTC,
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Get the display name for the configured timezone
    pub fn display_name(&self) -> &str {
        if self.is_utc { "UTC" } else { self.tz.name() }
    }

    /// Weekday and wall-clock time of an instant in this timezone
    pub fn local_weekday_and_time(&self, ts: DateTime<Utc>) -> (Weekday, NaiveTime) {
        let local = ts.with_timezone(&self.tz);
        (local.weekday(), local.time())
    }

    /// Calendar date of an instant in this timezone
    pub fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.tz).date_naive()
    }
}
