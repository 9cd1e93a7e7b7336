// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageOutputFormat, RgbImage};
use mockall::mock;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Arc;

use facewatch::{
    cache::{BroadcastPubSub, MemoryCache},
    core::{
        detection::{BoundingBox, Detection, Detector, Point, Pose},
        services::{FrameRelay, PipelineManager, Services, TracingSink},
    },
    storage::{MemoryProfileStore, NewProfile, Profile, ProfileStore, ThreatLevel},
    utils::{config::Config, error::Result},
};

pub const DIM: usize = 4;

mock! {
    pub FaceDetector {}

    #[async_trait]
    impl Detector for FaceDetector {
        async fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
    }
}

/// Replays one detection list per call, then keeps repeating the last one.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Vec<Detection>>>,
    last: Mutex<Vec<Detection>>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(Vec::new()),
        }
    }

    pub fn always(detections: Vec<Detection>) -> Self {
        let detector = Self::new(Vec::new());
        *detector.last.lock() = detections;
        detector
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
        let next = self.script.lock().pop_front();
        match next {
            Some(detections) => {
                *self.last.lock() = detections.clone();
                Ok(detections)
            }
            None => Ok(self.last.lock().clone()),
        }
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.recognition.dimension = DIM;
    config.scheduler.throttle = 1;
    config
}

pub struct TestContext {
    pub store: Arc<MemoryProfileStore>,
    pub cache: Arc<MemoryCache>,
    pub pubsub: Arc<BroadcastPubSub>,
    pub relay: Arc<FrameRelay>,
    pub services: Services,
    pub manager: PipelineManager,
}

impl TestContext {
    pub fn new(config: Config, detector: Arc<dyn Detector>) -> Self {
        let store = Arc::new(MemoryProfileStore::new());
        let cache = Arc::new(MemoryCache::new());
        let pubsub = Arc::new(BroadcastPubSub::default());
        let relay = Arc::new(FrameRelay::new(config.scheduler.get_frame_ttl()));

        let services = Services::new(
            config,
            store.clone(),
            cache.clone(),
            pubsub.clone(),
            detector,
            relay.clone(),
            Arc::new(TracingSink),
        );
        let manager = PipelineManager::new(services.clone());

        Self {
            store,
            cache,
            pubsub,
            relay,
            services,
            manager,
        }
    }

    /// Stores a profile directly and makes it searchable.
    pub async fn seed(&self, id: &str, name: &str, threat: ThreatLevel, embedding: Vec<f32>) {
        let profile = Profile::new(
            NewProfile {
                id: id.to_string(),
                name: name.to_string(),
                threat_level: threat,
                ..Default::default()
            },
            embedding,
            Vec::new(),
        );
        self.store.upsert(&profile).await.expect("seed profile");
        self.services.index.rebuild().await.expect("rebuild index");
    }
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

pub fn face_at(x: f32, y: f32, embedding: Vec<f32>) -> Detection {
    Detection::new(BoundingBox::around(Point::new(x, y), 40.0, 40.0), embedding)
}

pub fn turned(detection: Detection, yaw: f32) -> Detection {
    detection.with_pose(Pose {
        yaw,
        ..Pose::default()
    })
}
