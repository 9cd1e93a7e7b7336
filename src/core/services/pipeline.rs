// src/core/services/pipeline.rs
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::frames::{FrameSink, FrameSource};
use super::scheduler::{InferenceScheduler, SchedulerShared};
use super::types::{PipelineEvent, RenderRecord};
use crate::{
    cache::{KvCache, PubSub},
    core::{detection::Detector, gating::SideEffects, recognition::RecognitionIndex},
    storage::ProfileStore,
    utils::{config::Config, metrics::MetricsSnapshot},
};

const EVENT_CAPACITY: usize = 1024;

/// Everything a pipeline needs, built once at startup and shared by clone.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<Config>,
    pub store: Arc<dyn ProfileStore>,
    pub cache: Arc<dyn KvCache>,
    pub pubsub: Arc<dyn PubSub>,
    pub detector: Arc<dyn Detector>,
    pub index: Arc<RecognitionIndex>,
    pub effects: Arc<SideEffects>,
    pub frames: Arc<dyn FrameSource>,
    pub sink: Arc<dyn FrameSink>,
    pub events: broadcast::Sender<PipelineEvent>,
}

impl Services {
    pub fn new(
        config: Config,
        store: Arc<dyn ProfileStore>,
        cache: Arc<dyn KvCache>,
        pubsub: Arc<dyn PubSub>,
        detector: Arc<dyn Detector>,
        frames: Arc<dyn FrameSource>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        let index = Arc::new(RecognitionIndex::new(
            store.clone(),
            detector.clone(),
            config.recognition.clone(),
        ));
        let effects = Arc::new(SideEffects::new(
            store.clone(),
            cache.clone(),
            pubsub.clone(),
            index.clone(),
            config.gating.clone(),
        ));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            config: Arc::new(config),
            store,
            cache,
            pubsub,
            detector,
            index,
            effects,
            frames,
            sink,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }
}

struct PipelineHandle {
    shared: Arc<SchedulerShared>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Runs one inference scheduler per camera source.
pub struct PipelineManager {
    services: Services,
    pipelines: Mutex<HashMap<String, PipelineHandle>>,
}

impl PipelineManager {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            pipelines: Mutex::new(HashMap::new()),
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Starts the frame loop of `source` unless it is already running.
    /// Returns whether a new loop was spawned.
    pub fn start(&self, source: &str) -> bool {
        let mut pipelines = self.pipelines.lock();
        if let Some(handle) = pipelines.get(source) {
            if !handle.task.is_finished() {
                return false;
            }
            warn!(source = %source, "Restarting pipeline whose frame loop exited");
        }

        let scheduler = InferenceScheduler::new(source, self.services.clone());
        let shared = scheduler.shared();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(scheduler.run(shutdown_rx));

        pipelines.insert(
            source.to_string(),
            PipelineHandle {
                shared,
                shutdown,
                task,
            },
        );
        info!(source = %source, "Pipeline started");
        true
    }

    /// Signals the frame loop of `source` to exit and waits for it. Returns
    /// whether the source was running.
    pub async fn stop(&self, source: &str) -> bool {
        let handle = self.pipelines.lock().remove(source);
        let Some(handle) = handle else {
            return false;
        };

        let _ = handle.shutdown.send(true);
        if let Err(e) = handle.task.await {
            warn!(source = %source, "Frame loop ended abnormally: {}", e);
        }
        info!(source = %source, "Pipeline stopped");
        true
    }

    pub async fn shutdown_all(&self) {
        let sources = self.sources();
        join_all(sources.iter().map(|source| self.stop(source))).await;
    }

    pub fn is_running(&self, source: &str) -> bool {
        self.pipelines.lock().contains_key(source)
    }

    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.pipelines.lock().keys().cloned().collect();
        sources.sort();
        sources
    }

    pub fn latest_results(&self, source: &str) -> Option<Arc<[RenderRecord]>> {
        self.pipelines
            .lock()
            .get(source)
            .map(|handle| handle.shared.latest_results())
    }

    pub fn metrics(&self, source: &str) -> Option<MetricsSnapshot> {
        self.pipelines
            .lock()
            .get(source)
            .map(|handle| handle.shared.metrics().snapshot())
    }
}
