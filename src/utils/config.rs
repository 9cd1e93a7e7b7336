use serde::Deserialize;
use std::time::Duration;
use config::{Config as ConfigLib, ConfigError, Environment, File};
use crate::utils::error::{Result, PipelineError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub tracking: TrackingConfig,
    pub recognition: RecognitionConfig,
    pub scheduler: SchedulerConfig,
    pub gating: GatingConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategyKind {
    Greedy,
    Optimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    /// Maximum centroid distance, in original-frame pixels, for a detection to continue a track.
    pub max_distance: f32,
    pub history_len: usize,
    pub inactivity_timeout_secs: f64,
    /// Weight of the newest box in the exponential bbox smoothing.
    pub smoothing: f32,
    pub strategy: MatchStrategyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    OldestFirst,
    LeastSimilar,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    pub dimension: usize,
    pub threshold: f32,
    pub cache_ttl_secs: u64,
    pub max_references: usize,
    pub eviction: EvictionPolicy,
    pub augment_min_similarity: f32,
    pub augment_tilt_degrees: f32,
    pub thumbnail_size: u32,
    pub thumbnail_padding: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Run inference on every Nth frame tick.
    pub throttle: u64,
    pub max_inference_size: u32,
    pub poll_interval_ms: u64,
    pub inactive_after_ms: u64,
    pub frame_ttl_ms: u64,
    pub rotate_ccw: bool,
    pub mirror: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatingConfig {
    pub log_cooldown_secs: u64,
    pub alert_cooldown_secs: u64,
    pub augment_cooldown_secs: u64,
    pub camera_location_ttl_secs: u64,
    pub atomic_locks: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// How often expired cache entries are swept out.
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn new() -> Result<Self> {
        let config = ConfigLib::builder()
            // Start with default values
            .set_default("node.host", "0.0.0.0")?
            .set_default("node.port", 8000)?
            .set_default("node.log_level", "info")?
            .set_default("storage.backend", "memory")?
            .set_default("storage.path", "data/profiles")?
            .set_default("tracking.max_distance", 150.0)?
            .set_default("tracking.history_len", 5)?
            .set_default("tracking.inactivity_timeout_secs", 2.0)?
            .set_default("tracking.smoothing", 0.3)?
            .set_default("tracking.strategy", "greedy")?
            .set_default("recognition.dimension", 512)?
            .set_default("recognition.threshold", 0.48)?
            .set_default("recognition.cache_ttl_secs", 15)?
            .set_default("recognition.max_references", 10)?
            .set_default("recognition.eviction", "oldest_first")?
            .set_default("recognition.augment_min_similarity", 0.35)?
            .set_default("recognition.augment_tilt_degrees", 15.0)?
            .set_default("recognition.thumbnail_size", 160)?
            .set_default("recognition.thumbnail_padding", 0.2)?
            .set_default("scheduler.throttle", 4)?
            .set_default("scheduler.max_inference_size", 480)?
            .set_default("scheduler.poll_interval_ms", 10)?
            .set_default("scheduler.inactive_after_ms", 1500)?
            .set_default("scheduler.frame_ttl_ms", 2000)?
            .set_default("scheduler.rotate_ccw", false)?
            .set_default("scheduler.mirror", false)?
            .set_default("gating.log_cooldown_secs", 120)?
            .set_default("gating.alert_cooldown_secs", 10)?
            .set_default("gating.augment_cooldown_secs", 3600)?
            .set_default("gating.camera_location_ttl_secs", 3600)?
            .set_default("gating.atomic_locks", false)?
            .set_default("cache.sweep_interval_secs", 30)?

            // Load from config file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., APP_SCHEDULER__THROTTLE)
            .add_source(Environment::with_prefix("APP").separator("__"))

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.port == 0 {
            return Err(PipelineError::Config("Invalid port number".into()));
        }

        if self.tracking.max_distance <= 0.0 {
            return Err(PipelineError::Config("tracking.max_distance must be positive".into()));
        }
        if self.tracking.history_len == 0 {
            return Err(PipelineError::Config("tracking.history_len must be greater than 0".into()));
        }
        if !(0.0..=1.0).contains(&self.tracking.smoothing) {
            return Err(PipelineError::Config("tracking.smoothing must lie in [0, 1]".into()));
        }

        if self.recognition.dimension == 0 {
            return Err(PipelineError::Config("recognition.dimension must be greater than 0".into()));
        }
        if self.recognition.max_references == 0 {
            return Err(PipelineError::Config("recognition.max_references must be at least 1".into()));
        }

        if self.scheduler.throttle == 0 {
            return Err(PipelineError::Config("scheduler.throttle must be greater than 0".into()));
        }
        if self.scheduler.max_inference_size == 0 {
            return Err(PipelineError::Config("scheduler.max_inference_size must be greater than 0".into()));
        }

        if self.cache.sweep_interval_secs == 0 {
            return Err(PipelineError::Config("cache.sweep_interval_secs must be greater than 0".into()));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                path: "data/profiles".to_string(),
            },
            tracking: TrackingConfig::default(),
            recognition: RecognitionConfig::default(),
            scheduler: SchedulerConfig::default(),
            gating: GatingConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_distance: 150.0,
            history_len: 5,
            inactivity_timeout_secs: 2.0,
            smoothing: 0.3,
            strategy: MatchStrategyKind::Greedy,
        }
    }
}

impl TrackingConfig {
    pub fn get_inactivity_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.inactivity_timeout_secs)
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            dimension: 512,
            threshold: 0.48,
            cache_ttl_secs: 15,
            max_references: 10,
            eviction: EvictionPolicy::OldestFirst,
            augment_min_similarity: 0.35,
            augment_tilt_degrees: 15.0,
            thumbnail_size: 160,
            thumbnail_padding: 0.2,
        }
    }
}

impl RecognitionConfig {
    pub fn get_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            throttle: 4,
            max_inference_size: 480,
            poll_interval_ms: 10,
            inactive_after_ms: 1500,
            frame_ttl_ms: 2000,
            rotate_ccw: false,
            mirror: false,
        }
    }
}

impl SchedulerConfig {
    pub fn get_poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn get_inactive_after(&self) -> Duration {
        Duration::from_millis(self.inactive_after_ms)
    }

    pub fn get_frame_ttl(&self) -> Duration {
        Duration::from_millis(self.frame_ttl_ms)
    }
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            log_cooldown_secs: 120,
            alert_cooldown_secs: 10,
            augment_cooldown_secs: 3600,
            camera_location_ttl_secs: 3600,
            atomic_locks: false,
        }
    }
}

impl GatingConfig {
    pub fn get_log_cooldown(&self) -> Duration {
        Duration::from_secs(self.log_cooldown_secs)
    }

    pub fn get_alert_cooldown(&self) -> Duration {
        Duration::from_secs(self.alert_cooldown_secs)
    }

    pub fn get_augment_cooldown(&self) -> Duration {
        Duration::from_secs(self.augment_cooldown_secs)
    }

    pub fn get_camera_location_ttl(&self) -> Duration {
        Duration::from_secs(self.camera_location_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 30,
        }
    }
}

impl CacheConfig {
    pub fn get_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl From<ConfigError> for PipelineError {
    fn from(error: ConfigError) -> Self {
        PipelineError::Config(error.to_string())
    }
}
