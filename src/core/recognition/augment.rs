// src/core/recognition/augment.rs
//! Reference-pose cap for auto-augmented profiles.
//!
//! `references[0]` is the enrolled embedding and is never evicted. When the
//! cap is reached, one auto-augmented reference makes room for the new one:
//! - `OldestFirst` drops the earliest augmented pose.
//! - `LeastSimilar` drops the augmented pose least similar to the enrolled one.

use super::types::Augmentation;
use super::vector::cosine_similarity;
use crate::utils::config::EvictionPolicy;

pub fn push_reference(
    references: &mut Vec<Vec<f32>>,
    candidate: Vec<f32>,
    max_references: usize,
    policy: EvictionPolicy,
) -> Augmentation {
    if references.len() < max_references {
        references.push(candidate);
        return Augmentation::Appended {
            references: references.len(),
        };
    }

    if references.len() <= 1 {
        return Augmentation::Rejected;
    }

    let evicted = match policy {
        EvictionPolicy::OldestFirst => 1,
        EvictionPolicy::LeastSimilar => {
            let enrolled = &references[0];
            references
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, r)| (i, cosine_similarity(enrolled, r)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(1)
        }
    };

    references.remove(evicted);
    // Over-full lists (cap lowered after the fact) shrink back to the cap.
    while references.len() >= max_references && references.len() > 1 {
        references.remove(1);
    }
    references.push(candidate);

    Augmentation::Replaced {
        evicted,
        references: references.len(),
    }
}
