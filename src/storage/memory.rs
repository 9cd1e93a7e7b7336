// src/storage/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use super::{ActivityRecord, Profile, ProfileStore, Result, MAX_CAMERA_LOCATIONS};

/// Process-local profile store, used when no persistent backend is configured.
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: RwLock<BTreeMap<String, Profile>>,
    activity: RwLock<Vec<ActivityRecord>>,
    cameras: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_all(&self) -> Result<Vec<Profile>> {
        Ok(self.profiles.read().values().cloned().collect())
    }

    async fn find(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.read().get(id).cloned())
    }

    async fn upsert(&self, profile: &Profile) -> Result<()> {
        self.profiles
            .write()
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.profiles.write().remove(id).is_some())
    }

    async fn insert_activity(&self, record: &ActivityRecord) -> Result<()> {
        self.activity.write().push(record.clone());
        Ok(())
    }

    async fn activity_report(
        &self,
        identity_id: &str,
        limit: usize,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityRecord>> {
        let activity = self.activity.read();
        let mut records: Vec<ActivityRecord> = activity
            .iter()
            .filter(|r| r.identity_id == identity_id)
            .filter(|r| since.map_or(true, |s| r.timestamp >= s))
            .cloned()
            .collect();

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    async fn register_camera(&self, source: &str, locations: &[String]) -> Result<()> {
        let kept: Vec<String> = locations.iter().take(MAX_CAMERA_LOCATIONS).cloned().collect();
        self.cameras.write().insert(source.to_string(), kept);
        Ok(())
    }

    async fn camera_locations(&self, source: &str) -> Result<Option<Vec<String>>> {
        Ok(self.cameras.read().get(source).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewProfile;
    use chrono::Duration;

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryProfileStore::new();
        let mut profile = Profile::new(
            NewProfile { id: "X".into(), name: "First".into(), ..Default::default() },
            vec![1.0],
            Vec::new(),
        );
        store.upsert(&profile).await.unwrap();
        profile.name = "Second".into();
        store.upsert(&profile).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Second");
        assert!(store.delete("X").await.unwrap());
        assert!(!store.delete("X").await.unwrap());
    }

    #[tokio::test]
    async fn test_activity_report_orders_and_filters() {
        let store = MemoryProfileStore::new();
        let now = Utc::now();
        for (offset, id) in [(3, "A"), (1, "A"), (2, "B"), (10, "A")] {
            let mut record = ActivityRecord::new(id, "cam-1", vec![]);
            record.timestamp = now - Duration::days(offset);
            store.insert_activity(&record).await.unwrap();
        }

        let report = store.activity_report("A", 2, None).await.unwrap();
        assert_eq!(report.len(), 2);
        assert!(report[0].timestamp > report[1].timestamp);

        let recent = store
            .activity_report("A", 50, Some(now - Duration::days(5)))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_camera_locations_are_capped() {
        let store = MemoryProfileStore::new();
        let locations = vec!["Gate".to_string(), "North".to_string(), "Extra".to_string()];
        store.register_camera("cam-1", &locations).await.unwrap();

        let stored = store.camera_locations("cam-1").await.unwrap().unwrap();
        assert_eq!(stored, vec!["Gate".to_string(), "North".to_string()]);
        assert!(store.camera_locations("cam-2").await.unwrap().is_none());
    }
}
