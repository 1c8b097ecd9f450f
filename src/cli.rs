//! CLI interface for gpuspend
//!
//! This module defines the command-line interface using clap. Every command
//! reads a dataset snapshot (see [`crate::dataset`]) and runs one analysis
//! over it.
//!
//! # Example
//!
//! ```bash
//! # High-severity recommendations for January 2026
//! gpuspend --data spend.json recommend --since 2026-01-01 --until 2026-01-31 --min-severity high
//!
//! # Two-week spend forecast for AWS H100s as JSON
//! gpuspend --data spend.json --json forecast spend --provider aws --gpu h100 --horizon 14
//!
//! # Digest and alerts for a given day
//! gpuspend --data spend.json digest --date 2026-01-31
//! gpuspend --data spend.json alerts --date 2026-01-31
//! ```

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use gpuspend_core::AnalyticsConfig;
use gpuspend_core::error::{Result, SpendError};
use gpuspend_core::timezone::TimezoneConfig;
use gpuspend_forecast::ForecastMetric;
use gpuspend_recommend::{RecommendationType, Severity};
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// GPU cloud spend analytics
#[derive(Parser, Debug, Clone)]
#[command(name = "gpuspend")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Dataset snapshot (JSON with teams, costs, usage and jobs)
    #[arg(long, short = 'd', env = "GPUSPEND_DATA", global = true)]
    pub data: Option<PathBuf>,

    /// Flat hourly GPU price used in savings estimates (USD)
    #[arg(long, env = "GPUSPEND_HOURLY_RATE", global = true)]
    pub hourly_rate: Option<f64>,

    /// Daily spend above which the burn-rate alert fires (USD)
    #[arg(long, env = "GPUSPEND_BURN_RATE_THRESHOLD", global = true)]
    pub burn_rate_threshold: Option<f64>,

    /// Timezone for business-hours classification (e.g. "America/New_York", "UTC")
    /// If not specified, UTC is used
    #[arg(long, short = 'z', global = true)]
    pub timezone: Option<String>,

    /// Use UTC for business-hours classification (overrides --timezone)
    #[arg(long, global = true)]
    pub utc: bool,

    /// Derive usage hours from job spans instead of reading them from the dataset
    #[arg(long, global = true)]
    pub derive_usage: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Disable the in-process forecast cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Analytics configuration from defaults overridden by flags and environment
    pub fn analytics_config(&self) -> Result<AnalyticsConfig> {
        let tz_config = TimezoneConfig::from_cli(self.timezone.as_deref(), self.utc)?;
        info!("Using timezone: {}", tz_config.display_name());

        let mut config = AnalyticsConfig::default().with_timezone(tz_config);
        if let Some(rate) = self.hourly_rate {
            config = config.with_hourly_rate(rate);
        }
        if let Some(threshold) = self.burn_rate_threshold {
            config = config.with_burn_rate_threshold(threshold);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate cost optimization recommendations
    Recommend {
        /// Start of the analysis window (YYYY-MM-DD); defaults to 29 days before --until
        #[arg(long)]
        since: Option<String>,

        /// End of the analysis window (YYYY-MM-DD); defaults to today
        #[arg(long)]
        until: Option<String>,

        /// Drop recommendations below this severity
        #[arg(long)]
        min_severity: Option<Severity>,

        /// Only include these recommendation types (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<RecommendationType>,

        /// Restrict job-based rules to one team
        #[arg(long)]
        team: Option<Uuid>,

        /// Drop recommendations saving less than this many USD
        #[arg(long)]
        min_savings: Option<f64>,

        /// Show only the N recommendations with the largest savings
        #[arg(long)]
        top: Option<usize>,
    },

    /// Forecast daily usage or spend
    Forecast {
        /// Series to forecast (usage or spend)
        #[arg(default_value = "spend")]
        metric: ForecastMetric,

        /// Restrict to one provider
        #[arg(long)]
        provider: Option<String>,

        /// Restrict to one GPU type
        #[arg(long)]
        gpu: Option<String>,

        /// Days to forecast (clamped to 1..=30)
        #[arg(long, default_value = "7")]
        horizon: u32,
    },

    /// Build the daily digest for a date
    Digest {
        /// Target date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Run the burn-rate and idle-spend alert checks
    Alerts {
        /// Date to check (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },
}

/// Parse a `YYYY-MM-DD` date argument
///
/// # Examples
/// ```
/// use gpuspend::cli::parse_date;
///
/// assert!(parse_date("2026-01-31").is_ok());
/// assert!(parse_date("2026-02-30").is_err());
/// assert!(parse_date("01/31/2026").is_err());
/// ```
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
        SpendError::InvalidDate(format!("'{date_str}'. Use the format YYYY-MM-DD"))
    })
}

/// Parse an optional date argument, falling back to `default`
pub fn parse_date_or(date_str: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    date_str.map_or(Ok(default), parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-01-31").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
        );
        assert!(matches!(
            parse_date("2026-13-01"),
            Err(SpendError::InvalidDate(_))
        ));
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_parse_date_or_default() {
        let default = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(parse_date_or(None, default).unwrap(), default);
        assert_eq!(
            parse_date_or(Some("2026-01-05"), default).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
    }

    #[test]
    fn test_recommend_args() {
        let cli = Cli::try_parse_from([
            "gpuspend",
            "--data",
            "spend.json",
            "recommend",
            "--since",
            "2026-01-01",
            "--min-severity",
            "high",
            "--type",
            "idle-gpu",
            "--type",
            "long_running_job",
        ])
        .unwrap();

        match cli.command {
            Command::Recommend {
                since,
                min_severity,
                types,
                ..
            } => {
                assert_eq!(since.as_deref(), Some("2026-01-01"));
                assert_eq!(min_severity, Some(Severity::High));
                assert_eq!(
                    types,
                    vec![RecommendationType::IdleGpu, RecommendationType::LongRunningJob]
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_forecast_defaults() {
        let cli = Cli::try_parse_from(["gpuspend", "forecast"]).unwrap();
        match cli.command {
            Command::Forecast {
                metric, horizon, ..
            } => {
                assert_eq!(metric, ForecastMetric::Spend);
                assert_eq!(horizon, 7);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(!cli.json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["gpuspend", "digest", "--json", "--quiet", "--utc"]).unwrap();
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(cli.utc);
    }

    #[test]
    fn test_analytics_config_overrides() {
        let cli = Cli::try_parse_from([
            "gpuspend",
            "--hourly-rate",
            "2.5",
            "--burn-rate-threshold",
            "500",
            "--timezone",
            "America/New_York",
            "alerts",
        ])
        .unwrap();
        let config = cli.analytics_config().unwrap();
        assert_eq!(config.hourly_gpu_rate, 2.5);
        assert_eq!(config.burn_rate_threshold_usd, 500.0);
        assert_eq!(config.timezone.display_name(), "America/New_York");
    }

    #[test]
    fn test_analytics_config_rejects_bad_values() {
        let cli = Cli::try_parse_from(["gpuspend", "--timezone", "Mars/Olympus", "alerts"]).unwrap();
        assert!(matches!(
            cli.analytics_config(),
            Err(SpendError::InvalidTimezone(_))
        ));

        let cli = Cli::try_parse_from(["gpuspend", "--hourly-rate=-1", "alerts"]).unwrap();
        assert!(matches!(cli.analytics_config(), Err(SpendError::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_metric() {
        assert!(Cli::try_parse_from(["gpuspend", "forecast", "tokens"]).is_err());
    }
}
