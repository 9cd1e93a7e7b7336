// src/core/tracking/mod.rs
pub mod matching;
pub mod store;
pub mod track;

pub use matching::{GreedyMatcher, MatchStrategy, OptimalMatcher};
pub use store::{TrackBinding, TrackStore};
pub use track::Track;
