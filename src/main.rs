//! gpuspend - GPU cloud spend analytics

use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use clap::Parser;
use gpuspend::{
    AlertReport, Dataset,
    cli::{Cli, Command, LogFormat, parse_date_or},
    get_formatter,
};
use gpuspend_core::Repository;
use gpuspend_digest::{AlertChecker, DigestGenerator};
use gpuspend_forecast::{ForecastCache, ForecastingService, MokaForecastCache};
use gpuspend_recommend::{RecommendationEngine, RecommendationFilters};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Days analysed by `recommend` when no start date is given, end date included
const DEFAULT_RECOMMEND_DAYS: i64 = 30;

fn init_logging(cli: &Cli) {
    // The --quiet flag overrides RUST_LOG
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gpuspend=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn load_repository(cli: &Cli) -> Result<Arc<dyn Repository>> {
    let Some(path) = cli.data.as_deref() else {
        bail!("No dataset given. Pass --data <path> or set GPUSPEND_DATA");
    };
    let repo = Dataset::load(path).await?.into_repository(cli.derive_usage)?;
    Ok(Arc::new(repo))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = cli.analytics_config()?;
    let repository = load_repository(&cli).await?;
    let formatter = get_formatter(cli.json);
    let today = Utc::now().date_naive();

    match cli.command {
        Command::Recommend {
            since,
            until,
            min_severity,
            types,
            team,
            min_savings,
            top,
        } => {
            info!("Running recommendation analysis");

            let end = parse_date_or(until.as_deref(), today)?;
            let start = parse_date_or(
                since.as_deref(),
                end - Duration::days(DEFAULT_RECOMMEND_DAYS - 1),
            )?;

            let mut filters = RecommendationFilters::new(start, end);
            if let Some(severity) = min_severity {
                filters = filters.with_min_severity(severity);
            }
            if !types.is_empty() {
                filters = filters.with_types(types);
            }
            if let Some(team_id) = team {
                filters = filters.with_team(team_id);
            }
            if let Some(min) = min_savings {
                filters = filters.with_min_savings(min);
            }

            let engine = RecommendationEngine::new(repository, config);
            let mut response = engine.generate(&filters).await;
            if let Some(limit) = top {
                response = response.into_top(limit);
            }

            println!("{}", formatter.format_recommendations(&response));
        }
        Command::Forecast {
            metric,
            provider,
            gpu,
            horizon,
        } => {
            info!("Running {} forecast", metric);

            let cache: Option<Arc<dyn ForecastCache>> = if cli.no_cache {
                None
            } else {
                Some(Arc::new(MokaForecastCache::default()))
            };
            let service = ForecastingService::new(repository, cache);
            let outcome = service
                .forecast(metric, provider.as_deref(), gpu.as_deref(), horizon)
                .await
                .context("Forecast failed")?;

            println!("{}", formatter.format_forecast(&outcome));
        }
        Command::Digest { date } => {
            let date = parse_date_or(date.as_deref(), today)?;
            info!("Building digest for {}", date);

            let digest = DigestGenerator::new(repository, config)
                .generate(date)
                .await
                .context("Digest generation failed")?;

            println!("{}", formatter.format_digest(&digest));
        }
        Command::Alerts { date } => {
            let date = parse_date_or(date.as_deref(), today)?;
            info!("Running alert checks for {}", date);

            let checker = AlertChecker::new(repository, config);
            let report = AlertReport {
                burn_rate: checker
                    .check_burn_rate(date)
                    .await
                    .context("Burn rate check failed")?,
                idle_spend: checker.check_idle_spend(date).await,
            };

            println!("{}", formatter.format_alerts(&report));
        }
    }

    Ok(())
}
