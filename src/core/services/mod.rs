// src/core/services/mod.rs
pub mod frames;
pub mod pipeline;
pub mod scheduler;
pub mod slot;
pub mod types;

pub use frames::{Frame, FrameRelay, FrameSink, FrameSource, TracingSink};
pub use pipeline::{PipelineManager, Services};
pub use scheduler::{InferenceScheduler, SchedulerShared};
pub use types::{PipelineEvent, RenderRecord};
