// src/storage/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl Default for ThreatLevel {
    fn default() -> Self {
        ThreatLevel::Low
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ThreatLevel::Low => "Low",
            ThreatLevel::Medium => "Medium",
            ThreatLevel::High => "High",
        };
        f.write_str(label)
    }
}

impl FromStr for ThreatLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(ThreatLevel::Low),
            "medium" => Ok(ThreatLevel::Medium),
            "high" => Ok(ThreatLevel::High),
            other => Err(format!("unknown threat level '{}'", other)),
        }
    }
}

/// An enrolled identity as held by the profile store.
///
/// `embeddings[0]` is the enrolled reference; any further entries are
/// auto-augmented poses, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub threat_level: ThreatLevel,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub thumbnail: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity fields supplied at enrollment time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub threat_level: ThreatLevel,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Partial update of a profile's descriptive fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub threat_level: Option<ThreatLevel>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Profile {
    pub fn new(fields: NewProfile, embedding: Vec<f32>, thumbnail: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            id: fields.id,
            name: fields.name,
            threat_level: fields.threat_level,
            phone: fields.phone,
            address: fields.address,
            embeddings: vec![embedding],
            thumbnail,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: ProfileUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(threat_level) = update.threat_level {
            self.threat_level = threat_level;
        }
        if let Some(phone) = update.phone {
            self.phone = phone;
        }
        if let Some(address) = update.address {
            self.address = address;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub identity_id: String,
    pub source: String,
    pub locations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn new(identity_id: &str, source: &str, locations: Vec<String>) -> Self {
        Self {
            identity_id: identity_id.to_string(),
            source: source.to_string(),
            locations,
            timestamp: Utc::now(),
        }
    }
}
