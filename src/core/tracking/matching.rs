// src/core/tracking/matching.rs
//! Detection-to-track association strategies.
//!
//! Both strategies only pair a detection with a track whose centroid is
//! strictly closer than the distance threshold, and never pair a track with
//! more than one detection.

use crate::core::detection::Point;
use crate::utils::config::MatchStrategyKind;

pub trait MatchStrategy: Send + Sync + std::fmt::Debug {
    /// For each detection centroid, the index into `tracks` it continues, if any.
    fn assign(&self, detections: &[Point], tracks: &[Point], max_distance: f32) -> Vec<Option<usize>>;
}

pub fn strategy_for(kind: MatchStrategyKind) -> Box<dyn MatchStrategy> {
    match kind {
        MatchStrategyKind::Greedy => Box::new(GreedyMatcher),
        MatchStrategyKind::Optimal => Box::new(OptimalMatcher),
    }
}

/// Single pass in detection order: each detection takes the nearest track not
/// yet claimed. Ties go to the earlier track. Cheap, but the result depends
/// on detector output order.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyMatcher;

impl MatchStrategy for GreedyMatcher {
    fn assign(&self, detections: &[Point], tracks: &[Point], max_distance: f32) -> Vec<Option<usize>> {
        let mut claimed = vec![false; tracks.len()];

        detections
            .iter()
            .map(|det| {
                let mut best = None;
                let mut nearest = max_distance;

                for (j, track) in tracks.iter().enumerate() {
                    if claimed[j] {
                        continue;
                    }
                    let dist = det.distance(track);
                    if dist < nearest {
                        nearest = dist;
                        best = Some(j);
                    }
                }

                if let Some(j) = best {
                    claimed[j] = true;
                }
                best
            })
            .collect()
    }
}

/// Maximum-cardinality, minimum-total-distance assignment (Kuhn–Munkres).
///
/// Pairs beyond the threshold are given a cost larger than any sum of valid
/// pairs, so the solver first maximises the number of gated matches and only
/// then minimises their total distance.
#[derive(Debug, Default, Clone, Copy)]
pub struct OptimalMatcher;

impl MatchStrategy for OptimalMatcher {
    fn assign(&self, detections: &[Point], tracks: &[Point], max_distance: f32) -> Vec<Option<usize>> {
        if detections.is_empty() || tracks.is_empty() {
            return vec![None; detections.len()];
        }

        let n = detections.len().max(tracks.len());
        let gated = max_distance as f64 * (n as f64 + 1.0);

        let mut cost = vec![vec![gated; n]; n];
        for (i, det) in detections.iter().enumerate() {
            for (j, track) in tracks.iter().enumerate() {
                let dist = det.distance(track);
                if dist < max_distance {
                    cost[i][j] = dist as f64;
                }
            }
        }

        let assignment = hungarian(&cost);

        (0..detections.len())
            .map(|i| {
                assignment[i].filter(|&j| {
                    j < tracks.len() && detections[i].distance(&tracks[j]) < max_distance
                })
            })
            .collect()
    }
}

/// Solves the square assignment problem, returning the column for each row.
fn hungarian(cost: &[Vec<f64>]) -> Vec<Option<usize>> {
    let n = cost.len();
    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    // p[j]: row (1-based) assigned to column j; p[0] is the row being inserted.
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; n];
    for j in 1..=n {
        if p[j] != 0 {
            assignment[p[j] - 1] = Some(j - 1);
        }
    }
    assignment
}
