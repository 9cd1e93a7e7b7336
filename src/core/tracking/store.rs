// src/core/tracking/store.rs
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use super::matching::{strategy_for, MatchStrategy};
use super::track::Track;
use crate::core::detection::{BoundingBox, Detection, Point, Pose};
use crate::core::recognition::IdentityMetadata;
use crate::utils::config::TrackingConfig;

/// Result of associating one detection with a track during [`TrackStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackBinding {
    pub track_id: u64,
    /// Detection box in original-frame coordinates.
    pub bbox: BoundingBox,
    pub smoothed_bbox: BoundingBox,
    pub landmarks_2d: Option<Vec<Point>>,
    pub landmarks_3d: Option<Vec<Point>>,
    pub pose: Option<Pose>,
    /// This frame's embedding, as opposed to the track average.
    pub embedding: Vec<f32>,
}

/// Active tracks of a single source.
///
/// Only the source's inference job mutates the store, so it carries no
/// locking of its own.
#[derive(Debug)]
pub struct TrackStore {
    tracks: BTreeMap<u64, Track>,
    last_id: u64,
    max_distance: f32,
    history_len: usize,
    smoothing: f32,
    inactivity_timeout: Duration,
    strategy: Box<dyn MatchStrategy>,
}

impl TrackStore {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            tracks: BTreeMap::new(),
            last_id: 0,
            max_distance: config.max_distance,
            history_len: config.history_len.max(1),
            smoothing: config.smoothing,
            inactivity_timeout: config.get_inactivity_timeout(),
            strategy: strategy_for(config.strategy),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn MatchStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn update(&mut self, detections: &[Detection], frame_scale: f32) -> Vec<TrackBinding> {
        self.update_at(detections, frame_scale, Instant::now())
    }

    /// Associates `detections` (in detector coordinates, produced on a frame
    /// resized by `frame_scale`) with existing tracks, creating tracks for the
    /// unmatched ones. Returns one binding per detection, in input order.
    pub fn update_at(
        &mut self,
        detections: &[Detection],
        frame_scale: f32,
        now: Instant,
    ) -> Vec<TrackBinding> {
        let scale = if frame_scale > 0.0 { frame_scale } else { 1.0 };
        let restored: Vec<Detection> = detections.iter().map(|d| d.unscaled(scale)).collect();

        // Only tracks that existed before this call are candidates.
        let candidate_ids: Vec<u64> = self.tracks.keys().copied().collect();
        let candidate_centroids: Vec<Point> =
            self.tracks.values().map(|t| t.centroid).collect();
        let detection_centroids: Vec<Point> =
            restored.iter().map(|d| d.bbox.centroid()).collect();

        let assignment =
            self.strategy
                .assign(&detection_centroids, &candidate_centroids, self.max_distance);

        let mut bindings = Vec::with_capacity(restored.len());
        for (detection, matched) in restored.into_iter().zip(assignment) {
            let track_id = match matched.map(|j| candidate_ids[j]) {
                Some(id) => {
                    if let Some(track) = self.tracks.get_mut(&id) {
                        track.observe(detection.bbox, detection.embedding.clone(), self.smoothing, now);
                    }
                    id
                }
                None => {
                    self.last_id += 1;
                    let id = self.last_id;
                    self.tracks.insert(
                        id,
                        Track::new(id, detection.bbox, detection.embedding.clone(), self.history_len, now),
                    );
                    debug!(track_id = id, "New track");
                    id
                }
            };

            let smoothed_bbox = self
                .tracks
                .get(&track_id)
                .map(|t| t.smoothed_bbox)
                .unwrap_or(detection.bbox);

            bindings.push(TrackBinding {
                track_id,
                bbox: detection.bbox,
                smoothed_bbox,
                landmarks_2d: detection.landmarks_2d,
                landmarks_3d: detection.landmarks_3d,
                pose: detection.pose,
                embedding: detection.embedding,
            });
        }

        bindings
    }

    pub fn prune_stale(&mut self) -> usize {
        self.prune_stale_at(Instant::now())
    }

    /// Drops every track unseen for longer than the inactivity timeout.
    /// Returns how many were removed.
    pub fn prune_stale_at(&mut self, now: Instant) -> usize {
        let timeout = self.inactivity_timeout;
        let before = self.tracks.len();
        self.tracks.retain(|_, track| !track.is_stale_at(now, timeout));

        let removed = before - self.tracks.len();
        if removed > 0 {
            debug!(removed, remaining = self.tracks.len(), "Pruned stale tracks");
        }
        removed
    }

    pub fn avg_embedding(&self, track_id: u64) -> Option<Vec<f32>> {
        self.tracks.get(&track_id).map(Track::avg_embedding)
    }

    /// Remembers the identity last recognised for a track. Returns the
    /// previous one.
    pub fn set_identity(
        &mut self,
        track_id: u64,
        identity: IdentityMetadata,
    ) -> Option<IdentityMetadata> {
        self.tracks
            .get_mut(&track_id)
            .and_then(|t| t.identity.replace(identity))
    }

    /// Drops all tracks. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn get(&self, track_id: u64) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
