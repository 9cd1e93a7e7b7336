pub mod api;
pub mod cache;
pub mod core;
pub mod storage;
pub mod utils;

use actix_web::{dev::ServerHandle, web};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    api::{rest::RestApi, ApiState},
    cache::{spawn_sweeper, BroadcastPubSub, MemoryCache},
    core::{
        detection::{Detector, NullDetector},
        services::{FrameRelay, PipelineManager, Services, TracingSink},
    },
    storage::{MemoryProfileStore, ProfileStore, RocksProfileStore},
    utils::{
        config::{Config, StorageBackend},
        error::Result,
    },
};

pub struct Application {
    config: Arc<Config>,
    services: Services,
    manager: Arc<PipelineManager>,
    relay: Arc<FrameRelay>,
    alerts: Arc<BroadcastPubSub>,
    server: Mutex<Option<ServerHandle>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Application {
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_detector(config, Arc::new(NullDetector)).await
    }

    /// Builds the application around a specific face detector backend.
    pub async fn with_detector(config: Config, detector: Arc<dyn Detector>) -> Result<Self> {
        info!("Initializing storage...");
        let store: Arc<dyn ProfileStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryProfileStore::new()),
            StorageBackend::Rocksdb => Arc::new(RocksProfileStore::open(&config.storage.path)?),
        };

        info!("Initializing services...");
        let relay = Arc::new(FrameRelay::new(config.scheduler.get_frame_ttl()));
        let alerts = Arc::new(BroadcastPubSub::default());
        let services = Services::new(
            config.clone(),
            store,
            Arc::new(MemoryCache::new()),
            alerts.clone(),
            detector,
            relay.clone(),
            Arc::new(TracingSink),
        );
        let manager = Arc::new(PipelineManager::new(services.clone()));

        Ok(Self {
            config: Arc::new(config),
            services,
            manager,
            relay,
            alerts,
            server: Mutex::new(None),
            sweeper: Mutex::new(None),
        })
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn manager(&self) -> &Arc<PipelineManager> {
        &self.manager
    }

    pub async fn start(&self) -> Result<()> {
        info!("Loading recognition index...");
        match self.services.index.rebuild().await {
            Ok(references) => info!("Recognition index ready with {} references", references),
            Err(e) => warn!("Starting with an empty recognition index: {}", e),
        }

        let sweeper = spawn_sweeper(
            self.services.cache.clone(),
            self.config.cache.get_sweep_interval(),
        );
        if let Some(previous) = self.sweeper.lock().replace(sweeper) {
            previous.abort();
        }

        info!("Starting API server...");
        let state = web::Data::new(ApiState::new(
            self.services.clone(),
            self.manager.clone(),
            self.relay.clone(),
            self.alerts.clone(),
        ));
        let server = RestApi::new(&self.config.node.host, self.config.node.port).bind(state)?;
        *self.server.lock() = Some(server.handle());

        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("API server failed: {}", e);
            }
        });

        info!("Application successfully started");
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application...");

        let server = self.server.lock().take();
        if let Some(server) = server {
            info!("Stopping API server...");
            server.stop(true).await;
        }

        info!("Stopping pipelines...");
        self.manager.shutdown_all().await;

        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.abort();
        }

        info!("Application shutdown complete");
        Ok(())
    }
}
