// src/core/detection/mod.rs
pub mod imaging;

use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Axis-aligned box as (x1, y1) top-left and (x2, y2) bottom-right corners.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box of the given size centred on `center`.
    pub fn around(center: Point, width: f32, height: f32) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            center.x + width / 2.0,
            center.y + height / 2.0,
        )
    }

    pub fn centroid(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Maps a box from a resized frame back to the original frame.
    pub fn unscaled(&self, scale: f32) -> Self {
        Self::new(self.x1 / scale, self.y1 / scale, self.x2 / scale, self.y2 / scale)
    }

    /// Exponential moving average towards `next`: `alpha * next + (1 - alpha) * self`.
    pub fn smoothed_towards(&self, next: &BoundingBox, alpha: f32) -> Self {
        let blend = |old: f32, new: f32| alpha * new + (1.0 - alpha) * old;
        Self::new(
            blend(self.x1, next.x1),
            blend(self.y1, next.y1),
            blend(self.x2, next.x2),
            blend(self.y2, next.y2),
        )
    }
}

/// Head pose in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Pose {
    pub fn is_tilted(&self, threshold_degrees: f32) -> bool {
        self.yaw.abs() > threshold_degrees
            || self.pitch.abs() > threshold_degrees
            || self.roll.abs() > threshold_degrees
    }
}

/// One face reported by the detector for one frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub landmarks_2d: Option<Vec<Point>>,
    pub landmarks_3d: Option<Vec<Point>>,
    pub embedding: Vec<f32>,
    pub pose: Option<Pose>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, embedding: Vec<f32>) -> Self {
        Self {
            bbox,
            embedding,
            ..Default::default()
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Detection with every coordinate divided by `scale`.
    pub fn unscaled(&self, scale: f32) -> Self {
        let unscale_points = |points: &Option<Vec<Point>>| {
            points.as_ref().map(|pts| {
                pts.iter()
                    .map(|p| Point::new(p.x / scale, p.y / scale))
                    .collect()
            })
        };

        Self {
            bbox: self.bbox.unscaled(scale),
            landmarks_2d: unscale_points(&self.landmarks_2d),
            landmarks_3d: unscale_points(&self.landmarks_3d),
            embedding: self.embedding.clone(),
            pose: self.pose,
        }
    }
}

/// Face detection plus embedding extraction.
///
/// Returns an empty list when no face is present; errors are reserved for
/// backend failures.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// Detector used when no inference backend is wired in. Never reports a face.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

#[async_trait]
impl Detector for NullDetector {
    async fn detect(&self, _image: &RgbImage) -> Result<Vec<Detection>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid_and_unscale() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 60.0);
        assert_eq!(bbox.centroid(), Point::new(20.0, 40.0));
        assert_eq!(bbox.unscaled(0.5), BoundingBox::new(20.0, 40.0, 60.0, 120.0));
    }

    #[test]
    fn test_smoothing_weights_new_box_by_alpha() {
        let old = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let new = BoundingBox::new(10.0, 10.0, 110.0, 110.0);
        let smoothed = old.smoothed_towards(&new, 0.3);
        assert!((smoothed.x1 - 3.0).abs() < 1e-5);
        assert!((smoothed.x2 - 103.0).abs() < 1e-5);
    }

    #[test]
    fn test_pose_tilt_uses_magnitude() {
        assert!(Pose { yaw: -20.0, pitch: 0.0, roll: 0.0 }.is_tilted(15.0));
        assert!(Pose { yaw: 0.0, pitch: 0.0, roll: 16.0 }.is_tilted(15.0));
        assert!(!Pose { yaw: 15.0, pitch: -15.0, roll: 5.0 }.is_tilted(15.0));
    }

    #[test]
    fn test_detection_unscaled_maps_landmarks() {
        let mut detection = Detection::new(BoundingBox::new(1.0, 1.0, 2.0, 2.0), vec![0.1]);
        detection.landmarks_2d = Some(vec![Point::new(4.0, 8.0)]);
        let restored = detection.unscaled(0.5);
        assert_eq!(restored.landmarks_2d.unwrap()[0], Point::new(8.0, 16.0));
        assert!(restored.landmarks_3d.is_none());
        assert_eq!(restored.embedding, vec![0.1]);
    }
}
