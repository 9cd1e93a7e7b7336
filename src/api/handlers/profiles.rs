// src/api/handlers/profiles.rs
use actix_web::{
    web::{self, Bytes, Data, Json, Path, Query},
    HttpResponse, Scope,
};
use chrono::{Duration, Utc};
use tracing::{error, info};

use crate::{
    api::{
        to_http_error,
        types::{ActivityQuery, EnrollQuery, ProfileResponse, UpdateProfileRequest},
        ApiState,
    },
    storage::{NewProfile, ProfileUpdate, ThreatLevel},
};

const DEFAULT_ACTIVITY_LIMIT: usize = 10;

pub fn scope() -> Scope {
    web::scope("/profiles")
        .service(web::resource("").route(web::get().to(list_profiles)))
        .service(web::resource("/enroll").route(web::post().to(enroll_profile)))
        .service(
            web::resource("/{id}")
                .route(web::get().to(get_profile))
                .route(web::put().to(update_profile))
                .route(web::delete().to(delete_profile)),
        )
        .service(web::resource("/{id}/activity").route(web::get().to(profile_activity)))
        .service(web::resource("/{id}/thumbnail").route(web::get().to(profile_thumbnail)))
}

fn parse_threat(raw: Option<&str>) -> Result<Option<ThreatLevel>, actix_web::Error> {
    raw.map(|s| s.parse::<ThreatLevel>())
        .transpose()
        .map_err(actix_web::error::ErrorBadRequest)
}

async fn enroll_profile(
    state: Data<ApiState>,
    query: Query<EnrollQuery>,
    body: Bytes,
) -> Result<HttpResponse, actix_web::Error> {
    let query = query.into_inner();
    info!("Received enrollment request for {}", query.id);

    let fields = NewProfile {
        threat_level: parse_threat(query.threat.as_deref())?.unwrap_or_default(),
        id: query.id,
        name: query.name,
        phone: query.phone.unwrap_or_default(),
        address: query.address.unwrap_or_default(),
    };

    let profile = state
        .services
        .index
        .enroll(&body, fields)
        .await
        .map_err(|e| {
            error!("Enrollment failed: {}", e);
            to_http_error(e)
        })?;

    Ok(HttpResponse::Created().json(ProfileResponse::from(&profile)))
}

async fn list_profiles(state: Data<ApiState>) -> Result<HttpResponse, actix_web::Error> {
    let profiles = state.services.index.profiles().await.map_err(to_http_error)?;
    let body: Vec<ProfileResponse> = profiles.iter().map(ProfileResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

async fn get_profile(
    state: Data<ApiState>,
    id: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let profile = state.services.index.profile(&id).await.map_err(to_http_error)?;
    Ok(HttpResponse::Ok().json(ProfileResponse::from(&profile)))
}

async fn update_profile(
    state: Data<ApiState>,
    id: Path<String>,
    request: Json<UpdateProfileRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let request = request.into_inner();
    let update = ProfileUpdate {
        threat_level: parse_threat(request.threat.as_deref())?,
        name: request.name,
        phone: request.phone,
        address: request.address,
    };

    let profile = state
        .services
        .index
        .update_profile(&id, update)
        .await
        .map_err(|e| {
            error!("Failed to update profile {}: {}", id, e);
            to_http_error(e)
        })?;

    info!("Updated profile {}", id);
    Ok(HttpResponse::Ok().json(ProfileResponse::from(&profile)))
}

async fn delete_profile(
    state: Data<ApiState>,
    id: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    state
        .services
        .index
        .delete_profile(&id)
        .await
        .map_err(to_http_error)?;

    Ok(HttpResponse::NoContent().finish())
}

async fn profile_activity(
    state: Data<ApiState>,
    id: Path<String>,
    query: Query<ActivityQuery>,
) -> Result<HttpResponse, actix_web::Error> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let since = query.days.map(|days| Utc::now() - Duration::days(days));

    let report = state
        .services
        .store
        .activity_report(&id, limit, since)
        .await
        .map_err(|e| to_http_error(e.into()))?;

    Ok(HttpResponse::Ok().json(report))
}

async fn profile_thumbnail(
    state: Data<ApiState>,
    id: Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let profile = state.services.index.profile(&id).await.map_err(to_http_error)?;
    if profile.thumbnail.is_empty() {
        return Err(actix_web::error::ErrorNotFound("Profile has no thumbnail"));
    }

    Ok(HttpResponse::Ok()
        .content_type("image/jpeg")
        .body(profile.thumbnail))
}
