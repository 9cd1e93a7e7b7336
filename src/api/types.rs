// src/api/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::services::RenderRecord;
use crate::storage::{Profile, ThreatLevel};

#[derive(Debug, Deserialize)]
pub struct EnrollQuery {
    pub id: String,
    pub name: String,
    pub threat: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub threat: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CameraLocationsRequest {
    pub locations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub name: String,
    pub threat_level: ThreatLevel,
    pub phone: String,
    pub address: String,
    pub references: usize,
    pub has_thumbnail: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            threat_level: profile.threat_level,
            phone: profile.phone.clone(),
            address: profile.address.clone(),
            references: profile.embeddings.len(),
            has_thumbnail: !profile.thumbnail.is_empty(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FrameAccepted {
    pub source: String,
    pub seq: u64,
    pub started: bool,
}

#[derive(Debug, Serialize)]
pub struct FacesResponse<'a> {
    pub source: &'a str,
    pub faces: &'a [RenderRecord],
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub uptime_secs: i64,
    pub references: usize,
    pub streams: usize,
}
