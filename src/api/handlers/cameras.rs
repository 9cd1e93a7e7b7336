// src/api/handlers/cameras.rs
use actix_web::{
    web::{self, Data, Json, Path},
    HttpResponse, Scope,
};

use crate::api::{to_http_error, types::CameraLocationsRequest, ApiState};

pub fn scope() -> Scope {
    web::scope("/cameras").service(
        web::resource("/{source}/locations")
            .route(web::get().to(get_locations))
            .route(web::put().to(put_locations)),
    )
}

async fn get_locations(
    state: Data<ApiState>,
    source: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let locations = state
        .services
        .effects
        .camera_locations(&source)
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::Ok().json(locations))
}

async fn put_locations(
    state: Data<ApiState>,
    source: Path<String>,
    request: Json<CameraLocationsRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    if request.locations.is_empty() {
        return Err(actix_web::error::ErrorBadRequest(
            "At least one location is required",
        ));
    }

    state
        .services
        .effects
        .register_camera(&source, &request.locations)
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::NoContent().finish())
}
