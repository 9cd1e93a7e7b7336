// src/api/handlers/streams.rs
use actix_web::{
    web::{self, Bytes, Data, Path},
    HttpResponse, Scope,
};
use tracing::{debug, info};

use crate::api::{
    types::{FacesResponse, FrameAccepted},
    ApiState,
};

pub fn scope() -> Scope {
    web::scope("/streams")
        .service(web::resource("").route(web::get().to(list_streams)))
        .service(web::resource("/{source}").route(web::delete().to(stop_stream)))
        .service(web::resource("/{source}/frame").route(web::post().to(push_frame)))
        .service(web::resource("/{source}/faces").route(web::get().to(stream_faces)))
        .service(web::resource("/{source}/stats").route(web::get().to(stream_stats)))
}

async fn list_streams(state: Data<ApiState>) -> HttpResponse {
    HttpResponse::Ok().json(state.manager.sources())
}

/// Hands a frame to the source's relay slot, starting its pipeline on the
/// first frame.
async fn push_frame(
    state: Data<ApiState>,
    source: Path<String>,
    body: Bytes,
) -> Result<HttpResponse, actix_web::Error> {
    if body.is_empty() {
        return Err(actix_web::error::ErrorBadRequest("Empty frame"));
    }

    let seq = state.relay.push(&source, body.to_vec());
    let started = state.manager.start(&source);
    if started {
        info!(source = %source, "Started pipeline on first frame");
    } else {
        debug!(source = %source, seq, "Frame queued");
    }

    Ok(HttpResponse::Accepted().json(FrameAccepted {
        source: source.into_inner(),
        seq,
        started,
    }))
}

async fn stream_faces(
    state: Data<ApiState>,
    source: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let faces = state
        .manager
        .latest_results(&source)
        .ok_or_else(|| actix_web::error::ErrorNotFound("Stream not running"))?;

    Ok(HttpResponse::Ok().json(FacesResponse {
        source: &source,
        faces: &faces,
    }))
}

async fn stream_stats(
    state: Data<ApiState>,
    source: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let metrics = state
        .manager
        .metrics(&source)
        .ok_or_else(|| actix_web::error::ErrorNotFound("Stream not running"))?;

    Ok(HttpResponse::Ok().json(metrics))
}

async fn stop_stream(
    state: Data<ApiState>,
    source: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    state.relay.remove(&source);
    if !state.manager.stop(&source).await {
        return Err(actix_web::error::ErrorNotFound("Stream not running"));
    }

    Ok(HttpResponse::NoContent().finish())
}
