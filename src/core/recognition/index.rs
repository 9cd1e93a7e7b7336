// src/core/recognition/index.rs
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::augment::push_reference;
use super::types::{Augmentation, IdentityMetadata, Match, ValidationError};
use super::vector::{l2_normalize, FlatIpIndex};
use crate::{
    core::detection::{
        imaging::{crop_thumbnail, decode_frame, Orientation},
        Detector,
    },
    storage::{NewProfile, Profile, ProfileStore, ProfileUpdate},
    utils::{
        config::RecognitionConfig,
        error::{PipelineError, Result},
    },
};

/// Immutable view searched by `query`. Row `i` of the index belongs to
/// `identities[owners[i]]`.
#[derive(Debug)]
struct Snapshot {
    index: FlatIpIndex,
    owners: Vec<usize>,
    identities: Vec<IdentityMetadata>,
}

impl Snapshot {
    fn empty(dimension: usize) -> Self {
        Self {
            index: FlatIpIndex::new(dimension),
            owners: Vec::new(),
            identities: Vec::new(),
        }
    }

    fn build(dimension: usize, profiles: &[Profile]) -> Self {
        let mut snapshot = Self::empty(dimension);

        for profile in profiles {
            let owner = snapshot.identities.len();
            let mut rows = Vec::with_capacity(profile.embeddings.len());

            for embedding in &profile.embeddings {
                if embedding.len() != dimension {
                    warn!(
                        "Skipping reference of profile {} with dimension {} (expected {})",
                        profile.id,
                        embedding.len(),
                        dimension
                    );
                    continue;
                }
                rows.push(l2_normalize(embedding));
            }

            if rows.is_empty() {
                continue;
            }

            // Dimensions were filtered above.
            if snapshot.index.add(&rows).is_ok() {
                snapshot.owners.extend(std::iter::repeat(owner).take(rows.len()));
                snapshot.identities.push(IdentityMetadata::from(profile));
            }
        }

        snapshot
    }
}

/// Embedding index over every enrolled profile.
///
/// Queries run against an immutable snapshot and never wait on a rebuild;
/// rebuilds are serialized and publish a new generation on completion.
pub struct RecognitionIndex {
    store: Arc<dyn ProfileStore>,
    detector: Arc<dyn Detector>,
    config: RecognitionConfig,
    snapshot: RwLock<Arc<Snapshot>>,
    rebuild_lock: Mutex<()>,
    updates: watch::Sender<u64>,
}

impl RecognitionIndex {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        detector: Arc<dyn Detector>,
        config: RecognitionConfig,
    ) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            snapshot: RwLock::new(Arc::new(Snapshot::empty(config.dimension))),
            store,
            detector,
            config,
            rebuild_lock: Mutex::new(()),
            updates,
        }
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    /// Number of reference embeddings currently searchable.
    pub fn len(&self) -> usize {
        self.snapshot.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Generation counter bumped after every successful rebuild.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    /// Reloads every profile and swaps in a fresh snapshot. On a store
    /// failure the previous snapshot stays in service.
    pub async fn rebuild(&self) -> Result<usize> {
        let _guard = self.rebuild_lock.lock().await;

        let profiles = self.store.find_all().await?;
        let snapshot = Snapshot::build(self.config.dimension, &profiles);
        let references = snapshot.index.len();
        let identities = snapshot.identities.len();

        *self.snapshot.write() = Arc::new(snapshot);
        self.updates.send_modify(|generation| *generation += 1);

        info!(
            "Recognition index rebuilt: {} identities, {} references",
            identities, references
        );
        Ok(references)
    }

    /// Rebuild after a write that already landed in the store. A failure is
    /// logged and the previous snapshot stays in service until the next one.
    async fn refresh(&self) {
        if let Err(e) = self.rebuild().await {
            warn!("Index rebuild after write failed, serving previous snapshot: {}", e);
        }
    }

    /// Best match for `embedding` whose similarity strictly exceeds `threshold`.
    pub fn query(&self, embedding: &[f32], threshold: f32) -> Result<Option<Match>> {
        if embedding.len() != self.config.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        let snapshot = Arc::clone(&*self.snapshot.read());
        if snapshot.index.is_empty() {
            return Ok(None);
        }

        let query = l2_normalize(embedding);
        let (scores, rows) = snapshot.index.search(&query, 1);

        let (score, row) = match (scores.first(), rows.first()) {
            (Some(&score), Some(&row)) if row >= 0 => (score, row as usize),
            _ => return Ok(None),
        };

        if score.is_nan() || score <= threshold {
            debug!("Best similarity {:.3} below threshold {:.3}", score, threshold);
            return Ok(None);
        }

        Ok(snapshot
            .owners
            .get(row)
            .and_then(|&owner| snapshot.identities.get(owner))
            .map(|metadata| Match {
                metadata: metadata.clone(),
                similarity: score,
            }))
    }

    /// Enrolls a profile from an image holding exactly one face. Enrolling an
    /// existing id replaces its references with the new one.
    pub async fn enroll(&self, image: &[u8], fields: NewProfile) -> Result<Profile> {
        if fields.id.trim().is_empty() {
            return Err(ValidationError::MissingId.into());
        }

        let frame = decode_frame(image, Orientation::default())
            .map_err(|e| ValidationError::InvalidImage(e.to_string()))?;

        let mut detections = self.detector.detect(&frame).await?;
        let detection = match detections.len() {
            0 => return Err(ValidationError::NoFaceDetected.into()),
            1 => detections.remove(0),
            n => return Err(ValidationError::MultipleFaces(n).into()),
        };

        if detection.embedding.len() != self.config.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.config.dimension,
                actual: detection.embedding.len(),
            });
        }

        let thumbnail = crop_thumbnail(
            &frame,
            &detection.bbox,
            self.config.thumbnail_padding,
            self.config.thumbnail_size,
        )
        .unwrap_or_else(|e| {
            warn!("Thumbnail for profile {} failed: {}", fields.id, e);
            Vec::new()
        });

        let mut profile = Profile::new(fields, l2_normalize(&detection.embedding), thumbnail);
        if let Some(existing) = self.store.find(&profile.id).await? {
            profile.created_at = existing.created_at;
        }

        self.store.upsert(&profile).await?;
        info!("Enrolled profile {} ({})", profile.id, profile.name);

        self.refresh().await;
        Ok(profile)
    }

    pub async fn profiles(&self) -> Result<Vec<Profile>> {
        Ok(self.store.find_all().await?)
    }

    pub async fn profile(&self, id: &str) -> Result<Profile> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| PipelineError::ProfileNotFound(id.to_string()))
    }

    pub async fn update_profile(&self, id: &str, update: ProfileUpdate) -> Result<Profile> {
        let mut profile = self.profile(id).await?;
        profile.apply(update);
        self.store.upsert(&profile).await?;

        self.refresh().await;
        Ok(profile)
    }

    pub async fn delete_profile(&self, id: &str) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(PipelineError::ProfileNotFound(id.to_string()));
        }
        info!("Deleted profile {}", id);

        self.refresh().await;
        Ok(())
    }

    /// Adds `embedding` as an extra reference pose of profile `id`.
    pub async fn augment(&self, id: &str, embedding: &[f32]) -> Result<Augmentation> {
        if embedding.len() != self.config.dimension {
            return Err(PipelineError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        let mut profile = self.profile(id).await?;
        let outcome = push_reference(
            &mut profile.embeddings,
            l2_normalize(embedding),
            self.config.max_references,
            self.config.eviction,
        );

        if outcome == Augmentation::Rejected {
            debug!("Augmentation of {} rejected at cap {}", id, self.config.max_references);
            return Ok(outcome);
        }

        profile.updated_at = chrono::Utc::now();
        self.store.upsert(&profile).await?;
        info!("Augmented profile {}: {:?}", id, outcome);

        self.refresh().await;
        Ok(outcome)
    }
}
