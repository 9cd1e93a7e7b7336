// src/cache/mod.rs
mod memory;
mod pubsub;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

pub use memory::MemoryCache;
pub use pubsub::{BroadcastPubSub, PubSub};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cached value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Key-value store with per-key expiry, backing the recognition cache and
/// cooldown locks.
#[async_trait]
pub trait KvCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Stores `value` only when `key` is absent. Returns whether it was stored.
    async fn set_nx(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<bool>;

    /// Drops every expired entry and returns how many went. Backends that
    /// expire keys themselves keep the default.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Sweeps `cache` every `every`. Recognition keys are rarely read twice, so
/// lazy expiry on access alone would never reclaim them.
pub fn spawn_sweeper(cache: Arc<dyn KvCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match cache.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "Swept expired cache entries"),
                Err(e) => warn!("Cache sweep failed: {}", e),
            }
        }
    })
}
