//! Usage and spend forecasting for gpuspend
//!
//! The [`ForecastingService`] reads daily history through a
//! [`Repository`](gpuspend_core::Repository), fills calendar gaps and projects
//! a horizon of up to 30 days with 95% confidence bands.
//!
//! Short histories use a moving-average + linear-trend baseline. Histories of
//! 30 days or more use gradient-boosted regression trees over lag features
//! (the `gbm` feature, on by default) and fall back to the baseline when the
//! model cannot be trained.

pub mod cache;
pub mod config;
#[cfg(feature = "gbm")]
pub mod gbm;
pub mod series;
pub mod service;
pub mod strategy;
pub mod types;

pub use cache::{ForecastCache, MokaForecastCache};
pub use config::{BoostingParams, ForecastConfig};
pub use service::ForecastingService;
pub use strategy::{ForecastStrategy, MovingAverageStrategy, Unavailable};
pub use types::{
    ForecastMetadata, ForecastMethod, ForecastMetric, ForecastOutcome, ForecastPoint,
    ForecastResult, InsufficientData,
};
