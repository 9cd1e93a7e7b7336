// src/utils/error.rs
use thiserror::Error;

use crate::cache::CacheError;
use crate::core::recognition::ValidationError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<image::ImageError> for PipelineError {
    fn from(error: image::ImageError) -> Self {
        PipelineError::Image(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
