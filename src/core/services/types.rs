// src/core/services/types.rs
use serde::Serialize;

use crate::core::detection::{BoundingBox, Point};
use crate::core::recognition::IdentityMetadata;
use crate::storage::ThreatLevel;

/// One tracked face as drawn on the latest frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderRecord {
    pub track_id: u64,
    pub bbox: BoundingBox,
    pub name: Option<String>,
    pub threat_level: Option<ThreatLevel>,
    pub similarity: Option<f32>,
    pub landmarks_2d: Option<Vec<Point>>,
    pub landmarks_3d: Option<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StreamActive {
        source: String,
    },
    StreamInactive {
        source: String,
    },
    PersonIdentified {
        source: String,
        track_id: u64,
        identity: IdentityMetadata,
        similarity: f32,
    },
}

impl PipelineEvent {
    pub fn source(&self) -> &str {
        match self {
            PipelineEvent::StreamActive { source }
            | PipelineEvent::StreamInactive { source }
            | PipelineEvent::PersonIdentified { source, .. } => source,
        }
    }
}
