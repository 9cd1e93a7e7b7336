// src/core/tracking/track.rs
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::detection::{BoundingBox, Point};
use crate::core::recognition::IdentityMetadata;

/// One physical face followed across frames of a single source.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u64,
    pub centroid: Point,
    pub last_seen: Instant,
    pub smoothed_bbox: BoundingBox,
    pub identity: Option<IdentityMetadata>,
    history: VecDeque<Vec<f32>>,
    capacity: usize,
}

impl Track {
    pub(crate) fn new(
        id: u64,
        bbox: BoundingBox,
        embedding: Vec<f32>,
        capacity: usize,
        now: Instant,
    ) -> Self {
        let mut history = VecDeque::with_capacity(capacity);
        history.push_back(embedding);

        Self {
            id,
            centroid: bbox.centroid(),
            last_seen: now,
            smoothed_bbox: bbox,
            identity: None,
            history,
            capacity,
        }
    }

    pub(crate) fn observe(
        &mut self,
        bbox: BoundingBox,
        embedding: Vec<f32>,
        smoothing: f32,
        now: Instant,
    ) {
        self.centroid = bbox.centroid();
        self.last_seen = now;
        self.smoothed_bbox = self.smoothed_bbox.smoothed_towards(&bbox, smoothing);

        self.history.push_back(embedding);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> impl Iterator<Item = &Vec<f32>> {
        self.history.iter()
    }

    /// Element-wise mean of the embedding history.
    pub fn avg_embedding(&self) -> Vec<f32> {
        let dim = self.history.iter().map(Vec::len).max().unwrap_or(0);
        let mut sum = vec![0.0f32; dim];

        for embedding in &self.history {
            for (acc, value) in sum.iter_mut().zip(embedding) {
                *acc += value;
            }
        }

        let n = self.history.len().max(1) as f32;
        sum.iter_mut().for_each(|v| *v /= n);
        sum
    }

    pub fn is_stale_at(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}
