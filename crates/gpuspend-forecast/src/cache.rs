//! Forecast result caching
//!
//! The forecasting service takes an optional [`ForecastCache`] at
//! construction. Entries are opaque bytes with a per-entry time to live.
//! [`MokaForecastCache`] is the in-process implementation.

use crate::types::ForecastMetric;
use async_trait::async_trait;
use gpuspend_core::Result;
use gpuspend_core::types::{GpuType, Provider};
use moka::Expiry;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Key/value store for serialized forecasts
#[async_trait]
pub trait ForecastCache: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store an entry that expires after `ttl`
    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
}

/// Deterministic cache key for a forecast request
///
/// Absent filters are keyed as `"all"`. The request is rendered as JSON with
/// sorted keys and hashed with SHA-256.
///
/// # Examples
/// ```
/// use gpuspend_forecast::cache::cache_key;
/// use gpuspend_forecast::ForecastMetric;
/// use gpuspend_core::types::Provider;
///
/// let a = cache_key(ForecastMetric::Spend, Some(&Provider::new("AWS")), None, 7);
/// let b = cache_key(ForecastMetric::Spend, Some(&Provider::new("aws")), None, 7);
/// assert_eq!(a, b);
/// assert!(a.starts_with("forecast:"));
/// ```
pub fn cache_key(
    metric: ForecastMetric,
    provider: Option<&Provider>,
    gpu_type: Option<&GpuType>,
    horizon_days: u32,
) -> String {
    let key_data = serde_json::json!({
        "type": metric.to_string(),
        "provider": provider.map_or("all", Provider::as_str),
        "gpu_type": gpu_type.map_or("all", GpuType::as_str),
        "horizon": horizon_days,
    });
    let hash = Sha256::digest(key_data.to_string().as_bytes());
    format!("forecast:{hash:x}")
}

#[derive(Clone)]
struct Entry {
    payload: Arc<Vec<u8>>,
    ttl: Duration,
}

struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process forecast cache with per-entry expiry
pub struct MokaForecastCache {
    cache: Cache<String, Entry>,
}

impl MokaForecastCache {
    /// Create a cache holding at most `max_capacity` forecasts
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { cache }
    }

    /// Number of live entries, after pending maintenance has run
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for MokaForecastCache {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl ForecastCache for MokaForecastCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let hit = self.cache.get(key).await;
        debug!(cache_key = key, hit = hit.is_some(), "Forecast cache lookup");
        Ok(hit.map(|entry| entry.payload.as_ref().clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let entry = Entry {
            payload: Arc::new(value),
            ttl,
        };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }
}
