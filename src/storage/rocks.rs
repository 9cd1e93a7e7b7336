// src/storage/rocks.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{Direction, IteratorMode, Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::{ActivityRecord, Profile, ProfileStore, Result, MAX_CAMERA_LOCATIONS};

const PROFILE_PREFIX: &str = "profile:";
const ACTIVITY_PREFIX: &str = "activity:";
const CAMERA_PREFIX: &str = "camera:";

/// RocksDB-backed profile store. Values are JSON documents under prefixed keys.
pub struct RocksProfileStore {
    db: DB,
}

impl RocksProfileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path)?;
        Ok(Self { db })
    }

    fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let serialized = serde_json::to_vec(value)?;
        self.db.put(key.as_bytes(), serialized)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.db.get(key.as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }

        Ok(values)
    }

    fn activity_key(record: &ActivityRecord) -> String {
        let nanos = record.timestamp.timestamp_nanos_opt().unwrap_or_default();
        format!(
            "{}{}:{:020}:{}",
            ACTIVITY_PREFIX,
            record.identity_id,
            nanos.max(0),
            Uuid::new_v4()
        )
    }
}

#[async_trait]
impl ProfileStore for RocksProfileStore {
    async fn find_all(&self) -> Result<Vec<Profile>> {
        self.scan(PROFILE_PREFIX)
    }

    async fn find(&self, id: &str) -> Result<Option<Profile>> {
        self.get(&format!("{}{}", PROFILE_PREFIX, id))
    }

    async fn upsert(&self, profile: &Profile) -> Result<()> {
        self.put(&format!("{}{}", PROFILE_PREFIX, profile.id), profile)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let key = format!("{}{}", PROFILE_PREFIX, id);
        let existed = self.db.get(key.as_bytes())?.is_some();
        if existed {
            self.db.delete(key.as_bytes())?;
        }
        Ok(existed)
    }

    async fn insert_activity(&self, record: &ActivityRecord) -> Result<()> {
        self.put(&Self::activity_key(record), record)
    }

    async fn activity_report(
        &self,
        identity_id: &str,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>> {
        let prefix = format!("{}{}:", ACTIVITY_PREFIX, identity_id);
        // Ids that share this prefix (e.g. "a" and "a:b") are filtered out by value.
        let mut records: Vec<ActivityRecord> = self
            .scan::<ActivityRecord>(&prefix)?
            .into_iter()
            .filter(|r| r.identity_id == identity_id)
            .filter(|r| since.map_or(true, |s| r.timestamp >= s))
            .collect();

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    async fn register_camera(&self, source: &str, locations: &[String]) -> Result<()> {
        let kept: Vec<String> = locations.iter().take(MAX_CAMERA_LOCATIONS).cloned().collect();
        self.put(&format!("{}{}", CAMERA_PREFIX, source), &kept)
    }

    async fn camera_locations(&self, source: &str) -> Result<Option<Vec<String>>> {
        self.get(&format!("{}{}", CAMERA_PREFIX, source))
    }
}

impl std::fmt::Debug for RocksProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksProfileStore")
            .field("path", &self.db.path())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewProfile, ThreatLevel};
    use tempfile::tempdir;

    fn profile(id: &str) -> Profile {
        Profile::new(
            NewProfile {
                id: id.into(),
                name: format!("Subject {}", id),
                threat_level: ThreatLevel::Medium,
                ..Default::default()
            },
            vec![0.5, 0.5, 0.0],
            vec![0xff, 0xd8],
        )
    }

    #[tokio::test]
    async fn test_profile_roundtrip_and_scan() {
        let temp_dir = tempdir().unwrap();
        let store = RocksProfileStore::open(temp_dir.path()).unwrap();

        store.upsert(&profile("B")).await.unwrap();
        store.upsert(&profile("A")).await.unwrap();
        store.register_camera("cam-1", &["Lobby".into()]).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(store.find("A").await.unwrap().unwrap(), all[0]);

        assert!(store.delete("A").await.unwrap());
        assert!(store.find("A").await.unwrap().is_none());
        assert!(!store.delete("A").await.unwrap());
    }

    #[tokio::test]
    async fn test_activity_scoped_to_identity() {
        let temp_dir = tempdir().unwrap();
        let store = RocksProfileStore::open(temp_dir.path()).unwrap();

        store.insert_activity(&ActivityRecord::new("a", "cam-1", vec![])).await.unwrap();
        store.insert_activity(&ActivityRecord::new("a:b", "cam-1", vec![])).await.unwrap();
        store.insert_activity(&ActivityRecord::new("a", "cam-2", vec![])).await.unwrap();

        let report = store.activity_report("a", 10, None).await.unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|r| r.identity_id == "a"));
        assert!(report[0].timestamp >= report[1].timestamp);
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let temp_dir = tempdir().unwrap();
        {
            let store = RocksProfileStore::open(temp_dir.path()).unwrap();
            store.upsert(&profile("P")).await.unwrap();
        }
        let store = RocksProfileStore::open(temp_dir.path()).unwrap();
        assert!(store.find("P").await.unwrap().is_some());
    }
}
