// src/core/services/scheduler.rs
use image::RgbImage;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::frames::Frame;
use super::pipeline::Services;
use super::slot::{JobSlot, ResultSlot};
use super::types::{PipelineEvent, RenderRecord};
use crate::{
    core::{
        detection::{
            imaging::{decode_frame, downscale, Orientation},
            Detection,
        },
        recognition::{embedding_hash, Match},
        tracking::{TrackBinding, TrackStore},
    },
    utils::metrics::SchedulerMetrics,
};

fn face_cache_key(embedding: &[f32]) -> String {
    format!("cache:face:{}", embedding_hash(embedding))
}

/// State shared between a source's frame loop and its inference jobs.
pub struct SchedulerShared {
    source: String,
    services: Services,
    tracks: Mutex<TrackStore>,
    job_slot: Arc<JobSlot>,
    results: ResultSlot,
    metrics: SchedulerMetrics,
    /// Recognition cache keys written by this source, with their expiry.
    cache_keys: SyncMutex<HashMap<String, Instant>>,
}

impl SchedulerShared {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn latest_results(&self) -> Arc<[RenderRecord]> {
        self.results.latest()
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    pub fn is_job_in_flight(&self) -> bool {
        self.job_slot.is_busy()
    }

    pub async fn track_count(&self) -> usize {
        self.tracks.lock().await.len()
    }

    fn emit(&self, event: PipelineEvent) {
        // Nobody listening is fine.
        let _ = self.services.events.send(event);
    }

    /// Full inference pass over one frame. Results computed for an epoch
    /// that has since been cleared are dropped.
    pub async fn run_job(&self, frame: RgbImage, epoch: u64) {
        let started = Instant::now();
        let max_side = self.services.config.scheduler.max_inference_size;
        let (small, scale) = downscale(&frame, max_side);

        let (detections, success) = match self.services.detector.detect(&small).await {
            Ok(detections) => (detections, true),
            Err(e) => {
                error!(source = %self.source, "Detection failed: {}", e);
                (Vec::new(), false)
            }
        };

        let records = self.infer(&detections, scale, epoch).await;
        self.metrics
            .record_job(started.elapsed(), detections.len(), success);

        if !self.results.publish(epoch, records) {
            debug!(source = %self.source, "Discarding results of a cleared epoch");
        }
    }

    /// Tracks, recognises and gates side effects for one frame's detections.
    /// Matches are only cached while `epoch` is current.
    pub async fn infer(
        &self,
        detections: &[Detection],
        scale: f32,
        epoch: u64,
    ) -> Vec<RenderRecord> {
        let mut tracks = self.tracks.lock().await;
        let bindings = tracks.update(detections, scale);
        let mut records = Vec::with_capacity(bindings.len());

        for binding in bindings {
            let average = tracks
                .avg_embedding(binding.track_id)
                .unwrap_or_else(|| binding.embedding.clone());

            let matched = self.recognize(&average, epoch).await;
            if let Some(hit) = &matched {
                let previous = tracks.set_identity(binding.track_id, hit.metadata.clone());
                if previous.as_ref() != Some(&hit.metadata) {
                    info!(
                        source = %self.source,
                        track_id = binding.track_id,
                        "Identified {} ({:.3})",
                        hit.metadata.name,
                        hit.similarity
                    );
                    self.emit(PipelineEvent::PersonIdentified {
                        source: self.source.clone(),
                        track_id: binding.track_id,
                        identity: hit.metadata.clone(),
                        similarity: hit.similarity,
                    });
                }
                self.apply_effects(hit, &binding).await;
            }

            records.push(RenderRecord {
                track_id: binding.track_id,
                bbox: binding.smoothed_bbox,
                name: matched.as_ref().map(|m| m.metadata.name.clone()),
                threat_level: matched.as_ref().map(|m| m.metadata.threat_level),
                similarity: matched.as_ref().map(|m| m.similarity),
                landmarks_2d: binding.landmarks_2d,
                landmarks_3d: binding.landmarks_3d,
            });
        }

        tracks.prune_stale();
        records
    }

    /// Resolves a track's average embedding through the recognition cache,
    /// falling back to the index.
    pub async fn recognize(&self, embedding: &[f32], epoch: u64) -> Option<Match> {
        let cache = &self.services.cache;
        let key = face_cache_key(embedding);

        match cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_slice::<Match>(&raw) {
                Ok(hit) => {
                    self.metrics.record_cache(true);
                    return Some(hit);
                }
                Err(e) => debug!("Ignoring malformed cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => debug!("Recognition cache unavailable: {}", e),
        }
        self.metrics.record_cache(false);

        let recognition = &self.services.config.recognition;
        let hit = match self.services.index.query(embedding, recognition.threshold) {
            Ok(hit) => hit?,
            Err(e) => {
                warn!(source = %self.source, "Index query failed: {}", e);
                return None;
            }
        };

        if self.results.epoch() == epoch {
            self.cache_match(key, &hit, epoch).await;
        }

        Some(hit)
    }

    /// Caches `hit` and records the key as owned. A match computed against a
    /// snapshot that was invalidated meanwhile is withdrawn again.
    async fn cache_match(&self, key: String, hit: &Match, epoch: u64) {
        let raw = match serde_json::to_vec(hit) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Could not encode match: {}", e);
                return;
            }
        };

        let ttl = self.services.config.recognition.get_cache_ttl();
        if let Err(e) = self.services.cache.set(&key, raw, ttl).await {
            debug!("Could not cache match: {}", e);
            return;
        }

        let stale = {
            let mut keys = self.cache_keys.lock();
            if self.results.epoch() == epoch {
                let now = Instant::now();
                keys.retain(|_, expires_at| *expires_at > now);
                keys.insert(key.clone(), now + ttl);
                false
            } else {
                true
            }
        };

        if stale {
            if let Err(e) = self.services.cache.delete(&key).await {
                debug!("Could not withdraw stale match {}: {}", key, e);
            }
        }
    }

    async fn apply_effects(&self, hit: &Match, binding: &TrackBinding) {
        let effects = &self.services.effects;
        let identity = &hit.metadata;

        effects.log_activity(identity, &self.source).await;
        effects.alert(identity, &self.source).await;

        if let Some(pose) = &binding.pose {
            effects
                .augment(identity, &self.source, &binding.embedding, hit.similarity, pose)
                .await;
        }
    }

    /// Drops published results and the recognition cache entries this source
    /// wrote, after the index changed underneath them.
    pub async fn invalidate(&self) {
        self.results.clear();

        let keys: Vec<String> = self.cache_keys.lock().drain().map(|(key, _)| key).collect();
        let mut deleted = 0;
        for key in &keys {
            match self.services.cache.delete(key).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => debug!("Could not evict {}: {}", key, e),
            }
        }

        debug!(source = %self.source, deleted, "Invalidated recognition results");
    }

    /// Forgets every track and published result. Any job in flight keeps
    /// running but its results are refused.
    pub async fn reset(&self) {
        self.results.clear();
        self.tracks.lock().await.clear();
    }
}

/// Frame loop of one source.
///
/// Decodes each new frame, hands every `throttle`-th one to a background
/// inference job when none is in flight, and renders whatever results were
/// last published. The loop itself never waits on inference.
pub struct InferenceScheduler {
    shared: Arc<SchedulerShared>,
    orientation: Orientation,
    tick: u64,
    last_seq: Option<u64>,
    last_frame_at: Instant,
    active: bool,
}

impl InferenceScheduler {
    pub fn new(source: &str, services: Services) -> Self {
        let scheduler = &services.config.scheduler;
        let orientation = Orientation {
            rotate_ccw: scheduler.rotate_ccw,
            mirror: scheduler.mirror,
        };
        let tracks = TrackStore::new(&services.config.tracking);

        Self {
            shared: Arc::new(SchedulerShared {
                source: source.to_string(),
                services,
                tracks: Mutex::new(tracks),
                job_slot: JobSlot::new(),
                results: ResultSlot::new(),
                metrics: SchedulerMetrics::new(),
                cache_keys: SyncMutex::new(HashMap::new()),
            }),
            orientation,
            tick: 0,
            last_seq: None,
            last_frame_at: Instant::now(),
            active: false,
        }
    }

    pub fn shared(&self) -> Arc<SchedulerShared> {
        Arc::clone(&self.shared)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Processes one encoded frame. Returns whether an inference job was
    /// dispatched for it.
    pub async fn on_frame(&mut self, data: &[u8]) -> bool {
        let shared = &self.shared;
        shared.metrics.record_frame();

        let frame = match decode_frame(data, self.orientation) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(source = %shared.source, "Dropping undecodable frame: {}", e);
                return false;
            }
        };

        self.tick += 1;
        let throttle = shared.services.config.scheduler.throttle.max(1);
        let mut dispatched = false;

        if self.tick % throttle == 0 {
            match shared.job_slot.try_acquire() {
                Some(permit) => {
                    shared.metrics.record_dispatch();
                    let job = Arc::clone(shared);
                    let job_frame = frame.clone();
                    let epoch = shared.results.epoch();
                    tokio::spawn(async move {
                        let _permit = permit;
                        job.run_job(job_frame, epoch).await;
                    });
                    dispatched = true;
                }
                None => shared.metrics.record_busy(),
            }
        }

        let records = shared.results.latest();
        shared
            .services
            .sink
            .render(&shared.source, &frame, &records)
            .await;

        dispatched
    }

    async fn poll(&mut self) {
        let now = Instant::now();
        let source = self.shared.source.clone();
        let frame = self.shared.services.frames.latest_frame(&source).await;

        match frame {
            Some(Frame { seq, data }) if self.last_seq != Some(seq) => {
                self.last_seq = Some(seq);
                self.last_frame_at = now;
                if !self.active {
                    self.active = true;
                    info!(source = %source, "Stream active");
                    self.shared.emit(PipelineEvent::StreamActive { source });
                }
                self.on_frame(&data).await;
            }
            _ => {
                let inactive_after = self.shared.services.config.scheduler.get_inactive_after();
                if self.active && now.duration_since(self.last_frame_at) >= inactive_after {
                    self.active = false;
                    info!(source = %source, "Stream inactive, clearing tracks");
                    self.deactivate();
                    self.shared.emit(PipelineEvent::StreamInactive { source });
                }
            }
        }
    }

    /// Clears state without blocking the loop on a job that holds the tracks.
    fn deactivate(&self) {
        self.shared.results.clear();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            shared.tracks.lock().await.clear();
        });
    }

    /// Polls the frame source until `shutdown` flips to true or its sender
    /// is dropped, invalidating results whenever the index is rebuilt.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut updates = self.shared.services.index.subscribe();
        let mut ticker = time::interval(self.shared.services.config.scheduler.get_poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(source = %self.shared.source, "Frame loop started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                Ok(()) = updates.changed() => {
                    self.shared.invalidate().await;
                }
                _ = ticker.tick() => {
                    self.poll().await;
                }
            }
        }

        self.shared.reset().await;
        info!(source = %self.shared.source, "Frame loop stopped");
    }
}
