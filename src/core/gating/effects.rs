// src/core/gating/effects.rs
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{EffectKind, Gate, GateOutcome};
use crate::{
    cache::{KvCache, PubSub},
    core::{
        detection::Pose,
        recognition::{IdentityMetadata, RecognitionIndex},
    },
    storage::{ActivityRecord, ProfileStore},
    utils::{config::GatingConfig, error::Result},
};

pub const ALERT_TOPIC: &str = "security_alerts";
const UNKNOWN_LOCATION: &str = "Unknown";

fn camera_location_key(source: &str) -> String {
    format!("cache:cam_loc:{}", source)
}

/// Cooldown-gated actions taken when a tracked face is identified.
///
/// Each method returns `None` when the identity or observation does not call
/// for the effect at all, and the gate's outcome otherwise.
pub struct SideEffects {
    store: Arc<dyn ProfileStore>,
    cache: Arc<dyn KvCache>,
    pubsub: Arc<dyn PubSub>,
    index: Arc<RecognitionIndex>,
    gate: Gate,
    config: GatingConfig,
}

impl SideEffects {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        cache: Arc<dyn KvCache>,
        pubsub: Arc<dyn PubSub>,
        index: Arc<RecognitionIndex>,
        config: GatingConfig,
    ) -> Self {
        Self {
            gate: Gate::new(cache.clone(), config.atomic_locks),
            store,
            cache,
            pubsub,
            index,
            config,
        }
    }

    /// Location labels of `source`, from the cache when fresh, else the store.
    /// Unregistered cameras resolve to two `Unknown` labels.
    pub async fn camera_locations(&self, source: &str) -> Result<Vec<String>> {
        let key = camera_location_key(source);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_slice::<Vec<String>>(&raw) {
                Ok(locations) => return Ok(locations),
                Err(e) => debug!("Ignoring malformed cached locations for {}: {}", source, e),
            },
            Ok(None) => {}
            Err(e) => debug!("Location cache unavailable for {}: {}", source, e),
        }

        let locations = self
            .store
            .camera_locations(source)
            .await?
            .unwrap_or_else(|| vec![UNKNOWN_LOCATION.to_string(); 2]);

        if let Ok(raw) = serde_json::to_vec(&locations) {
            if let Err(e) = self
                .cache
                .set(&key, raw, self.config.get_camera_location_ttl())
                .await
            {
                debug!("Could not cache locations for {}: {}", source, e);
            }
        }

        Ok(locations)
    }

    /// Stores new location labels for `source` and drops the cached ones.
    pub async fn register_camera(&self, source: &str, locations: &[String]) -> Result<()> {
        self.store.register_camera(source, locations).await?;
        if let Err(e) = self.cache.delete(&camera_location_key(source)).await {
            debug!("Could not evict cached locations for {}: {}", source, e);
        }
        info!(source = %source, "Registered camera locations {:?}", locations);
        Ok(())
    }

    pub async fn log_activity(
        &self,
        identity: &IdentityMetadata,
        source: &str,
    ) -> Option<GateOutcome> {
        let id = identity.activity_key()?;

        let outcome = self
            .gate
            .try_run(
                EffectKind::ActivityLog,
                id,
                source,
                self.config.get_log_cooldown(),
                move || self.record_activity(id, source),
            )
            .await;

        Some(outcome)
    }

    pub async fn alert(&self, identity: &IdentityMetadata, source: &str) -> Option<GateOutcome> {
        if !identity.is_high_threat() {
            return None;
        }

        let outcome = self
            .gate
            .try_run(
                EffectKind::Alert,
                &identity.id,
                source,
                self.config.get_alert_cooldown(),
                move || self.publish_alert(identity, source),
            )
            .await;

        Some(outcome)
    }

    /// Stores `embedding` as an extra reference pose when the face is turned
    /// away from the camera yet still confidently matched.
    pub async fn augment(
        &self,
        identity: &IdentityMetadata,
        source: &str,
        embedding: &[f32],
        similarity: f32,
        pose: &Pose,
    ) -> Option<GateOutcome> {
        let recognition = self.index.config();
        if !pose.is_tilted(recognition.augment_tilt_degrees)
            || similarity <= recognition.augment_min_similarity
        {
            return None;
        }

        let outcome = self
            .gate
            .try_run(
                EffectKind::Augment,
                &identity.id,
                source,
                self.config.get_augment_cooldown(),
                move || self.augment_profile(&identity.id, embedding),
            )
            .await;

        Some(outcome)
    }

    async fn record_activity(&self, id: &str, source: &str) -> Result<()> {
        let locations = self.camera_locations(source).await?;
        let record = ActivityRecord::new(id, source, locations);
        self.store.insert_activity(&record).await?;
        info!(source = %source, "Logged activity for {}", id);
        Ok(())
    }

    async fn publish_alert(&self, identity: &IdentityMetadata, source: &str) -> Result<()> {
        let message = json!({
            "type": "SECURITY_ALERT",
            "message": format!("High Security Alert: {} spotted at {}", identity.name, source),
            "name": identity.name,
            "source": source,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let delivered = self.pubsub.publish(ALERT_TOPIC, message.to_string()).await?;
        if delivered == 0 {
            warn!(source = %source, "No alert consumer connected for {}", identity.name);
            return Ok(());
        }
        info!(
            source = %source,
            "Security alert for {} delivered to {} subscribers",
            identity.name, delivered
        );
        Ok(())
    }

    async fn augment_profile(&self, id: &str, embedding: &[f32]) -> Result<()> {
        self.index.augment(id, embedding).await?;
        Ok(())
    }
}
