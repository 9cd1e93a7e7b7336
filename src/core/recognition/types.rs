// src/core/recognition/types.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{Profile, ThreatLevel};

/// Read-only projection of a profile carried by the index and the
/// recognition cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    pub id: String,
    pub name: String,
    pub threat_level: ThreatLevel,
    pub phone: String,
    pub address: String,
}

impl IdentityMetadata {
    /// Key under which sightings of this identity are logged, when it has one.
    pub fn activity_key(&self) -> Option<&str> {
        let id = self.id.trim();
        if id.is_empty() || id.eq_ignore_ascii_case("unknown") {
            None
        } else {
            Some(id)
        }
    }

    pub fn is_high_threat(&self) -> bool {
        self.threat_level == ThreatLevel::High
    }

    #[cfg(test)]
    pub(crate) fn for_test(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            threat_level: ThreatLevel::Low,
            phone: String::new(),
            address: String::new(),
        }
    }
}

impl From<&Profile> for IdentityMetadata {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            threat_level: profile.threat_level,
            phone: profile.phone.clone(),
            address: profile.address.clone(),
        }
    }
}

/// Best index hit for a query embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub metadata: IdentityMetadata,
    pub similarity: f32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("No faces detected in enrollment image")]
    NoFaceDetected,

    #[error("Enrollment image must contain exactly one face, found {0}")]
    MultipleFaces(usize),

    #[error("Could not decode enrollment image: {0}")]
    InvalidImage(String),

    #[error("Profile id must not be empty")]
    MissingId,
}

/// What happened to a profile's references on auto-augmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Augmentation {
    Appended { references: usize },
    Replaced { evicted: usize, references: usize },
    /// The cap leaves no room beside the enrolled reference.
    Rejected,
}
