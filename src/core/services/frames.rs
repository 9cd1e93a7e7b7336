// src/core/services/frames.rs
use async_trait::async_trait;
use image::RgbImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

use super::types::RenderRecord;

/// Encoded frame with its per-source sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub seq: u64,
    pub data: Arc<[u8]>,
}

#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Newest frame of `source`, if one is fresh enough to process.
    async fn latest_frame(&self, source: &str) -> Option<Frame>;
}

#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn render(&self, source: &str, frame: &RgbImage, records: &[RenderRecord]);
}

struct Slot {
    frame: Frame,
    received_at: Instant,
}

/// Keeps only the newest frame pushed for each source; frames older than
/// the TTL are no longer handed out.
pub struct FrameRelay {
    frames: Mutex<HashMap<String, Slot>>,
    ttl: Duration,
}

impl FrameRelay {
    pub fn new(ttl: Duration) -> Self {
        Self {
            frames: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Stores `data` as the newest frame of `source`, returning its sequence number.
    pub fn push(&self, source: &str, data: Vec<u8>) -> u64 {
        let mut frames = self.frames.lock();
        let seq = frames.get(source).map(|s| s.frame.seq + 1).unwrap_or(1);
        frames.insert(
            source.to_string(),
            Slot {
                frame: Frame {
                    seq,
                    data: Arc::from(data),
                },
                received_at: Instant::now(),
            },
        );
        seq
    }

    pub fn remove(&self, source: &str) -> bool {
        self.frames.lock().remove(source).is_some()
    }
}

#[async_trait]
impl FrameSource for FrameRelay {
    async fn latest_frame(&self, source: &str) -> Option<Frame> {
        let frames = self.frames.lock();
        frames
            .get(source)
            .filter(|slot| slot.received_at.elapsed() <= self.ttl)
            .map(|slot| slot.frame.clone())
    }
}

/// Sink used when frames are not displayed anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl FrameSink for TracingSink {
    async fn render(&self, source: &str, frame: &RgbImage, records: &[RenderRecord]) {
        trace!(
            source = %source,
            width = frame.width(),
            height = frame.height(),
            faces = records.len(),
            "Rendered frame"
        );
    }
}
