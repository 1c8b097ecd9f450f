//! Output formatting module for gpuspend
//!
//! This module provides formatters for displaying analysis results in
//! different formats:
//! - Table format for human-readable terminal output
//! - JSON format for machine-readable output and integration with other tools
//!
//! # Examples
//!
//! ```
//! use gpuspend::output::get_formatter;
//! use gpuspend_recommend::{RecommendationFilters, RecommendationResponse};
//! use chrono::NaiveDate;
//!
//! let day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
//! let response = RecommendationResponse::failed(&RecommendationFilters::new(day, day), "no data");
//!
//! let json = get_formatter(true).format_recommendations(&response);
//! assert!(json.contains("\"recommendations\""));
//! ```

use colored::Colorize;
use gpuspend_digest::{BurnRateAlert, DigestPayload, IdleSpendAlert};
use gpuspend_forecast::{ForecastOutcome, ForecastResult};
use gpuspend_recommend::{RecommendationResponse, Severity};
use prettytable::{Cell, Row, Table, format, row};
use serde::{Deserialize, Serialize};

/// Outcome of both alert checks for one date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertReport {
    pub burn_rate: Option<BurnRateAlert>,
    pub idle_spend: Option<IdleSpendAlert>,
}

impl AlertReport {
    /// Whether any check fired
    pub fn any(&self) -> bool {
        self.burn_rate.is_some() || self.idle_spend.is_some()
    }
}

/// Trait for output formatters
///
/// Implementations render each command's result as a single string.
pub trait OutputFormatter {
    /// Format a recommendation response
    fn format_recommendations(&self, response: &RecommendationResponse) -> String;

    /// Format a forecast, including the insufficient-data case
    fn format_forecast(&self, outcome: &ForecastOutcome) -> String;

    /// Format a daily digest
    fn format_digest(&self, digest: &DigestPayload) -> String;

    /// Format the alert checks
    fn format_alerts(&self, report: &AlertReport) -> String;
}

/// Table formatter for human-readable output
pub struct TableFormatter {
    /// Whether to use colored output (respects NO_COLOR environment variable)
    colored_output: bool,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFormatter {
    /// Create a new TableFormatter
    pub fn new() -> Self {
        Self {
            colored_output: std::env::var("NO_COLOR").is_err(),
        }
    }

    /// Create a formatter that never emits ANSI colors
    pub fn plain() -> Self {
        Self {
            colored_output: false,
        }
    }

    /// Format currency with dollar sign
    fn format_currency(amount: f64) -> String {
        format!("${amount:.2}")
    }

    /// Format a signed percentage
    fn format_percent(value: f64) -> String {
        format!("{value:+.2}%")
    }

    fn severity_cell(severity: Severity) -> Cell {
        let spec = match severity {
            Severity::High => "Fr",
            Severity::Medium => "Fy",
            Severity::Low => "Fg",
        };
        Cell::new(&severity.to_string()).style_spec(spec)
    }

    fn heading(&self, text: &str) -> String {
        if self.colored_output {
            format!("{}\n", text.bold())
        } else {
            format!("{text}\n")
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.colored_output {
            format!("{}\n", text.yellow())
        } else {
            format!("{text}\n")
        }
    }

    fn new_table() -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table
    }

    fn forecast_table(result: &ForecastResult) -> Table {
        let mut table = Self::new_table();
        table.set_titles(row![b -> "Date", b -> "Forecast", b -> "Lower", b -> "Upper"]);
        for point in &result.forecast {
            table.add_row(row![
                point.date.format("%Y-%m-%d"),
                r -> format!("{:.2}", point.value),
                r -> format!("{:.2}", point.lower_bound),
                r -> format!("{:.2}", point.upper_bound)
            ]);
        }
        table
    }
}

impl OutputFormatter for TableFormatter {
    fn format_recommendations(&self, response: &RecommendationResponse) -> String {
        let mut output = self.heading(&format!(
            "Recommendations for {}",
            response.date_range
        ));

        if let Some(error) = &response.summary.error {
            output.push_str(&self.warning(&format!("Analysis failed: {error}")));
            return output;
        }
        if response.recommendations.is_empty() {
            output.push_str("No recommendations found\n");
            return output;
        }

        let mut table = Self::new_table();
        table.set_titles(row![
            b -> "Severity",
            b -> "Type",
            b -> "Title",
            b -> "Savings"
        ]);
        for rec in &response.recommendations {
            table.add_row(Row::new(vec![
                Self::severity_cell(rec.severity),
                Cell::new(&rec.kind.to_string()),
                Cell::new(&rec.title),
                Cell::new(&Self::format_currency(rec.estimated_savings_usd)).style_spec("r"),
            ]));
        }
        table.add_row(Row::new(vec![Cell::new(""); 4]));
        table.add_row(row![
            b -> "TOTAL",
            b -> format!("{} found", response.summary.total),
            "",
            br -> Self::format_currency(response.total_estimated_savings_usd)
        ]);

        output.push_str(&table.to_string());
        output
    }

    fn format_forecast(&self, outcome: &ForecastOutcome) -> String {
        let result = match outcome {
            ForecastOutcome::Ready(result) => result,
            ForecastOutcome::InsufficientData(data) => return self.warning(&data.error),
        };

        let scope = format!(
            "{} / {}",
            result.provider.as_ref().map_or("all", |p| p.as_str()),
            result.gpu_type.as_ref().map_or("all", |g| g.as_str())
        );
        let mut output = self.heading(&format!(
            "{}-day {} forecast ({}) using {}",
            result.horizon_days, result.metric, scope, result.forecast_method
        ));
        output.push_str(&format!(
            "Based on {} days of history\n",
            result.metadata.historical_data_points
        ));
        if let Some(reason) = &result.metadata.fallback_reason {
            output.push_str(&self.warning(&format!("Fell back to moving average: {reason}")));
        }
        output.push_str(&Self::forecast_table(result).to_string());
        output
    }

    fn format_digest(&self, digest: &DigestPayload) -> String {
        let mut output = self.heading(&format!("Daily digest for {}", digest.date));

        let mut totals = Self::new_table();
        totals.set_titles(row![b -> "Window", b -> "Spend"]);
        totals.add_row(row!["Day", r -> Self::format_currency(digest.total_daily_cost)]);
        totals.add_row(row!["Last 7 days", r -> Self::format_currency(digest.total_weekly_cost)]);
        totals.add_row(row!["Last 30 days", r -> Self::format_currency(digest.total_monthly_cost)]);
        totals.add_row(row!["Change vs previous day", r -> Self::format_percent(digest.daily_change_percent)]);
        output.push_str(&totals.to_string());

        if !digest.global_top_contributors.is_empty() {
            output.push('\n');
            output.push_str(&self.heading("Top contributors"));
            let mut table = Self::new_table();
            table.set_titles(row![b -> "Pool", b -> "Cost"]);
            for contributor in &digest.global_top_contributors {
                table.add_row(row![
                    contributor.label,
                    r -> Self::format_currency(contributor.cost)
                ]);
            }
            output.push_str(&table.to_string());
        }

        if !digest.global_recommendations.is_empty() {
            output.push('\n');
            output.push_str(&self.heading("Top recommendations"));
            let mut table = Self::new_table();
            table.set_titles(row![b -> "Severity", b -> "Title", b -> "Savings"]);
            for rec in &digest.global_recommendations {
                table.add_row(Row::new(vec![
                    Self::severity_cell(rec.severity),
                    Cell::new(&rec.title),
                    Cell::new(&Self::format_currency(rec.savings)).style_spec("r"),
                ]));
            }
            output.push_str(&table.to_string());
        }

        output.push_str(&format!(
            "\nPotential savings: {}\n",
            Self::format_currency(digest.global_potential_savings)
        ));
        output
    }

    fn format_alerts(&self, report: &AlertReport) -> String {
        if !report.any() {
            return "No alerts\n".to_string();
        }

        let mut output = String::new();
        if let Some(alert) = &report.burn_rate {
            output.push_str(&self.warning(&format!(
                "Burn rate alert for {}: {} spent, {} over the {} threshold",
                alert.date,
                Self::format_currency(alert.daily_cost),
                Self::format_percent(alert.percentage_over),
                Self::format_currency(alert.threshold)
            )));
        }
        if let Some(alert) = &report.idle_spend {
            output.push_str(&self.warning(&format!(
                "Idle spend alert for {}: {} idle pools, {} potential savings",
                alert.date_range,
                alert.recommendations.len(),
                Self::format_currency(alert.total_savings)
            )));
            for rec in &alert.recommendations {
                output.push_str(&format!("  - {}\n", rec.title));
            }
        }
        output
    }
}

/// JSON formatter for machine-readable output
///
/// Results are serialized as-is, so the output mirrors the library types.
pub struct JsonFormatter;

impl JsonFormatter {
    fn render<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_recommendations(&self, response: &RecommendationResponse) -> String {
        Self::render(response)
    }

    fn format_forecast(&self, outcome: &ForecastOutcome) -> String {
        Self::render(outcome)
    }

    fn format_digest(&self, digest: &DigestPayload) -> String {
        Self::render(digest)
    }

    fn format_alerts(&self, report: &AlertReport) -> String {
        Self::render(report)
    }
}

/// Get the formatter for the requested output mode
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gpuspend_core::types::DateRange;
    use gpuspend_digest::DigestRecommendation;
    use gpuspend_forecast::InsufficientData;
    use gpuspend_recommend::RecommendationFilters;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn digest() -> DigestPayload {
        DigestPayload {
            date: day(10),
            total_daily_cost: 100.0,
            total_weekly_cost: 700.0,
            total_monthly_cost: 3000.0,
            daily_change_percent: 25.0,
            teams: Vec::new(),
            global_top_contributors: Vec::new(),
            global_recommendations: vec![DigestRecommendation {
                title: "Idle H100 GPUs on AWS".to_string(),
                savings: 1176.0,
                severity: Severity::High,
                description: String::new(),
            }],
            global_potential_savings: 1176.0,
        }
    }

    #[test]
    fn test_currency_and_percent_formatting() {
        assert_eq!(TableFormatter::format_currency(12.345), "$12.35");
        assert_eq!(TableFormatter::format_currency(0.0), "$0.00");
        assert_eq!(TableFormatter::format_percent(25.0), "+25.00%");
        assert_eq!(TableFormatter::format_percent(-3.5), "-3.50%");
    }

    #[test]
    fn test_failed_recommendations_show_error() {
        let response =
            RecommendationResponse::failed(&RecommendationFilters::new(day(5), day(1)), "inverted");
        let output = TableFormatter::plain().format_recommendations(&response);
        assert!(output.contains("Analysis failed: inverted"));
    }

    #[test]
    fn test_insufficient_forecast_message() {
        let outcome = ForecastOutcome::InsufficientData(InsufficientData::new(7, 3));
        let output = TableFormatter::plain().format_forecast(&outcome);
        assert!(output.contains("Need at least 7 days, found 3"));

        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter.format_forecast(&outcome)).unwrap();
        assert_eq!(json["forecast"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_digest_table() {
        let output = TableFormatter::plain().format_digest(&digest());
        assert!(output.contains("Daily digest for 2026-01-10"));
        assert!(output.contains("$3000.00"));
        assert!(output.contains("+25.00%"));
        assert!(output.contains("Idle H100 GPUs on AWS"));
        assert!(output.contains("Potential savings: $1176.00"));
    }

    #[test]
    fn test_digest_json() {
        let json: serde_json::Value =
            serde_json::from_str(&get_formatter(true).format_digest(&digest())).unwrap();
        assert_eq!(json["total_weekly_cost"], 700.0);
        assert_eq!(json["global_recommendations"][0]["severity"], "high");
    }

    #[test]
    fn test_alerts() {
        let formatter = TableFormatter::plain();
        assert_eq!(formatter.format_alerts(&AlertReport::default()), "No alerts\n");

        let report = AlertReport {
            burn_rate: Some(BurnRateAlert {
                date: day(5),
                daily_cost: 12_000.0,
                threshold: 10_000.0,
                percentage_over: 20.0,
            }),
            idle_spend: Some(IdleSpendAlert {
                date_range: DateRange::new(day(1), day(15)).unwrap(),
                recommendations: Vec::new(),
                total_savings: 0.0,
            }),
        };
        let output = formatter.format_alerts(&report);
        assert!(output.contains("Burn rate alert for 2026-01-05: $12000.00 spent, +20.00%"));
        assert!(output.contains("Idle spend alert for 2026-01-01 to 2026-01-15"));
    }
}
