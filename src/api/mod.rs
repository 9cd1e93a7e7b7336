// src/api/mod.rs
pub mod handlers;
pub mod rest;
pub mod types;

use std::sync::Arc;

use crate::cache::BroadcastPubSub;
use crate::core::services::{FrameRelay, PipelineManager, Services};
use crate::utils::error::PipelineError;

/// Shared state of the admin API.
pub struct ApiState {
    pub services: Services,
    pub manager: Arc<PipelineManager>,
    pub relay: Arc<FrameRelay>,
    /// Topic fan-out the alert feed subscribes to; the same instance the
    /// side effects publish on.
    pub alerts: Arc<BroadcastPubSub>,
    pub started_at: i64,
}

impl ApiState {
    pub fn new(
        services: Services,
        manager: Arc<PipelineManager>,
        relay: Arc<FrameRelay>,
        alerts: Arc<BroadcastPubSub>,
    ) -> Self {
        Self {
            services,
            manager,
            relay,
            alerts,
            started_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Maps pipeline failures onto HTTP statuses: caller mistakes are 400,
/// unknown profiles 404, everything else 500.
pub fn to_http_error(error: PipelineError) -> actix_web::Error {
    match error {
        PipelineError::Validation(_)
        | PipelineError::DimensionMismatch { .. }
        | PipelineError::Image(_) => actix_web::error::ErrorBadRequest(error),
        PipelineError::ProfileNotFound(_) => actix_web::error::ErrorNotFound(error),
        _ => actix_web::error::ErrorInternalServerError(error),
    }
}
