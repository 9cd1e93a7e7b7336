// src/api/rest.rs
use actix_cors::Cors;
use actix_web::{dev::Server, web, App, HttpServer};
use tracing::info;

use super::{handlers, ApiState};
use crate::utils::error::{PipelineError, Result};

/// Upper bound for enrollment images and pushed frames.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .service(web::resource("/health").route(web::get().to(handlers::health)))
        .configure(handlers::alerts::configure)
        .service(handlers::profiles::scope())
        .service(handlers::cameras::scope())
        .service(handlers::streams::scope());
}

pub struct RestApi {
    host: String,
    port: u16,
}

impl RestApi {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }

    /// Binds the admin API. The returned server runs once awaited or spawned.
    pub fn bind(&self, state: web::Data<ApiState>) -> Result<Server> {
        let server = HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(state.clone())
                .configure(configure)
        })
        .bind((self.host.as_str(), self.port))
        .map_err(|e| PipelineError::Config(format!("Failed to bind API server: {}", e)))?
        .run();

        info!("Admin API listening on {}:{}", self.host, self.port);
        Ok(server)
    }
}
