// src/api/handlers/mod.rs
pub mod alerts;
pub mod cameras;
pub mod profiles;
pub mod streams;

use actix_web::{web::Data, HttpResponse};

use super::{types::HealthResponse, ApiState};

pub async fn health(state: Data<ApiState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        uptime_secs: chrono::Utc::now().timestamp() - state.started_at,
        references: state.services.index.len(),
        streams: state.manager.sources().len(),
    })
}
