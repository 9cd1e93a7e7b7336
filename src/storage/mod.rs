// src/storage/mod.rs
mod errors;
mod memory;
mod rocks;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use errors::{Result, StorageError};
pub use memory::MemoryProfileStore;
pub use rocks::RocksProfileStore;
pub use types::{ActivityRecord, NewProfile, Profile, ProfileUpdate, ThreatLevel};

/// Keyed persistence for identity profiles, activity logs and camera metadata.
///
/// Implementations must offer read-after-write consistency: a `find_all`
/// issued after an `upsert` returns has to observe it.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Profile>>;

    async fn find(&self, id: &str) -> Result<Option<Profile>>;

    async fn upsert(&self, profile: &Profile) -> Result<()>;

    /// Returns whether a profile was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn insert_activity(&self, record: &ActivityRecord) -> Result<()>;

    /// Most recent first, at most `limit` records, optionally no older than `since`.
    async fn activity_report(
        &self,
        identity_id: &str,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>>;

    async fn register_camera(&self, source: &str, locations: &[String]) -> Result<()>;

    async fn camera_locations(&self, source: &str) -> Result<Option<Vec<String>>>;
}

/// Cameras carry at most a primary and a secondary location label.
pub(crate) const MAX_CAMERA_LOCATIONS: usize = 2;
