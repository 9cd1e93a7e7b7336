// src/core/recognition/vector.rs
use sha3::{Digest, Sha3_256};

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Unit-length copy of `v`. The zero vector is returned unchanged.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm = l2_norm(v);
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let denom = l2_norm(a) * l2_norm(b);
    if denom > 0.0 {
        dot(a, b) / denom
    } else {
        0.0
    }
}

/// Stable cache key for an embedding: SHA3-256 over its little-endian bytes.
pub fn embedding_hash(v: &[f32]) -> String {
    let mut hasher = Sha3_256::new();
    for x in v {
        hasher.update(x.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Exhaustive inner-product index over row vectors of a fixed dimension.
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends rows. Every vector must have exactly `dimension` components.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<(), usize> {
        if let Some(bad) = vectors.iter().find(|v| v.as_ref().len() != self.dimension) {
            return Err(bad.as_ref().len());
        }
        for v in vectors {
            self.data.extend_from_slice(v.as_ref());
        }
        Ok(())
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Top-`k` rows by inner product, best first. Missing slots are padded
    /// with `f32::NEG_INFINITY` scores and `-1` indices.
    pub fn search(&self, query: &[f32], k: usize) -> (Vec<f32>, Vec<i64>) {
        let mut scored: Vec<(f32, i64)> = (0..self.len())
            .map(|i| (dot(query, self.row(i)), i as i64))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored.resize(k, (f32::NEG_INFINITY, -1));

        scored.into_iter().unzip()
    }
}
