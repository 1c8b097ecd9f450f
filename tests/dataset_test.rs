//! End-to-end tests from a dataset snapshot on disk to rendered output

mod common;

use common::{JobBuilder, day};
use gpuspend::dataset::Dataset;
use gpuspend::output::TableFormatter;
use gpuspend::{OutputFormatter, get_formatter};
use gpuspend_core::AnalyticsConfig;
use gpuspend_core::types::{CostRecord, Team, UsageRecord};
use gpuspend_digest::DigestGenerator;
use gpuspend_forecast::{ForecastMetric, ForecastingService, MokaForecastCache};
use gpuspend_recommend::{RecommendationEngine, RecommendationFilters};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn snapshot() -> Dataset {
    let team = Team {
        id: Uuid::new_v4(),
        name: "ml-research".to_string(),
    };
    let mut dataset = Dataset {
        teams: vec![team.clone()],
        ..Dataset::default()
    };
    for d in 1..=21 {
        dataset
            .costs
            .push(CostRecord::new(day(d), "AWS", "H100", 84.0 + f64::from(d)).unwrap());
        dataset
            .costs
            .push(CostRecord::new(day(d), "gcp", "a100", 48.0).unwrap());
        dataset
            .usage
            .push(UsageRecord::new(day(d), "gcp", "a100", 20.0).unwrap());
    }
    dataset.jobs.push(
        JobBuilder::new(team.id)
            .with_id("train-70b")
            .with_model("llama-70b")
            .on("aws", "h100")
            .starting(common::at(12, 3, 0))
            .running_for(80.0)
            .build(),
    );
    dataset
}

async fn write_snapshot(dir: &TempDir, dataset: &Dataset) -> std::path::PathBuf {
    let path = dir.path().join("spend.json");
    tokio::fs::write(&path, serde_json::to_vec_pretty(dataset).unwrap())
        .await
        .unwrap();
    path
}

#[tokio::test]
async fn test_snapshot_round_trip_through_disk() {
    let dir = TempDir::new().unwrap();
    let dataset = snapshot();
    let path = write_snapshot(&dir, &dataset).await;

    let loaded = Dataset::load(&path).await.unwrap();
    assert_eq!(loaded, dataset);
    let repo = loaded.into_repository(false).unwrap();
    assert_eq!(repo.record_counts(), (42, 21, 1));
}

#[tokio::test]
async fn test_recommendations_from_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = write_snapshot(&dir, &snapshot()).await;
    let repo = Dataset::load(&path)
        .await
        .unwrap()
        .into_repository(false)
        .unwrap();

    let engine = RecommendationEngine::new(Arc::new(repo), AnalyticsConfig::default());
    let response = engine
        .generate(&RecommendationFilters::new(day(8), day(21)))
        .await;

    // Idle AWS pool and the 80 hour job; the GCP pool runs at 83%
    assert_eq!(response.summary.total, 2);
    let titles: Vec<&str> = response
        .recommendations
        .iter()
        .map(|r| r.title.as_str())
        .collect();
    assert!(titles.contains(&"Idle H100 GPUs on AWS"));
    assert!(titles.contains(&"Long-running job: llama-70b (ml-research)"));

    let table = TableFormatter::plain().format_recommendations(&response);
    assert!(table.contains("Idle H100 GPUs on AWS"));
    assert!(table.contains("TOTAL"));

    let json: serde_json::Value =
        serde_json::from_str(&get_formatter(true).format_recommendations(&response)).unwrap();
    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["recommendations"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_top_limit_keeps_summary_consistent() {
    let repo = snapshot().into_repository(false).unwrap();
    let engine = RecommendationEngine::new(Arc::new(repo), AnalyticsConfig::default());
    let full = engine
        .generate(&RecommendationFilters::new(day(8), day(21)))
        .await;
    let best = full.top_by_savings(1)[0].estimated_savings_usd;

    let top = full.clone().into_top(1);
    let json: serde_json::Value =
        serde_json::from_str(&get_formatter(true).format_recommendations(&top)).unwrap();
    assert_eq!(json["recommendations"].as_array().unwrap().len(), 1);
    assert_eq!(json["summary"]["total"], 1);
    let shown = json["total_estimated_savings_usd"].as_f64().unwrap();
    assert!((shown - best).abs() < 0.01);
    assert!(top.total_estimated_savings_usd < full.total_estimated_savings_usd);
}

#[tokio::test]
async fn test_forecast_and_digest_from_snapshot() {
    let repo = Arc::new(snapshot().into_repository(false).unwrap());

    let service = ForecastingService::new(repo.clone(), Some(Arc::new(MokaForecastCache::default())));
    let outcome = service
        .forecast(ForecastMetric::Spend, Some("aws"), None, 5)
        .await
        .unwrap();
    let result = outcome.result().unwrap();
    assert_eq!(result.historical.len(), 21);
    assert_eq!(result.forecast.len(), 5);
    assert_eq!(result.forecast[0].date, day(22));
    // Spend rises by a dollar a day
    assert!(result.forecast[0].value > 105.0);

    let rendered = TableFormatter::plain().format_forecast(&outcome);
    assert!(rendered.contains("5-day spend forecast (aws / all) using moving_average"));

    let digest = DigestGenerator::new(repo, AnalyticsConfig::default())
        .generate(day(21))
        .await
        .unwrap();
    assert_eq!(digest.total_daily_cost, 153.0);
    assert_eq!(digest.global_top_contributors.len(), 2);
    assert_eq!(digest.global_top_contributors[0].label, "H100 (AWS)");
}

#[tokio::test]
async fn test_derived_usage_replaces_snapshot_usage() {
    let dataset = snapshot();
    let repo = dataset.into_repository(true).unwrap();
    // One 80 hour job becomes usage records; the snapshot's GCP usage is dropped
    let (_, usage, _) = repo.record_counts();
    assert_eq!(usage, 4);
}

#[tokio::test]
async fn test_malformed_snapshot_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    tokio::fs::write(&path, b"{\"costs\": [{\"date\": \"not a date\"}]}")
        .await
        .unwrap();

    let err = Dataset::load(&path).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse dataset"));
    assert!(matches!(
        err.downcast_ref::<gpuspend_core::SpendError>(),
        Some(gpuspend_core::SpendError::Json(_))
    ));
}
