// src/core/recognition/mod.rs
pub mod augment;
pub mod index;
pub mod types;
pub mod vector;

pub use index::RecognitionIndex;
pub use types::{Augmentation, IdentityMetadata, Match, ValidationError};
pub use vector::{cosine_similarity, embedding_hash, l2_normalize, FlatIpIndex};
