// src/core/detection/imaging.rs
use image::{
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
    ColorType, RgbImage,
};

use super::BoundingBox;
use crate::utils::error::Result;

/// Fix-ups applied to every decoded frame of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Orientation {
    pub rotate_ccw: bool,
    pub mirror: bool,
}

pub fn decode_frame(data: &[u8], orientation: Orientation) -> Result<RgbImage> {
    let mut frame = image::load_from_memory(data)?.to_rgb8();

    if orientation.rotate_ccw {
        frame = imageops::rotate270(&frame);
    }
    if orientation.mirror {
        imageops::flip_horizontal_in_place(&mut frame);
    }

    Ok(frame)
}

/// Shrinks `frame` so its longest side is at most `max_side`, keeping the
/// aspect ratio. Returns the resized frame and the applied scale (<= 1.0).
pub fn downscale(frame: &RgbImage, max_side: u32) -> (RgbImage, f32) {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return (frame.clone(), 1.0);
    }

    let scale = (max_side as f32 / w as f32).min(max_side as f32 / h as f32);
    if scale >= 1.0 {
        return (frame.clone(), 1.0);
    }

    let nw = ((w as f32 * scale) as u32).max(1);
    let nh = ((h as f32 * scale) as u32).max(1);
    (imageops::resize(frame, nw, nh, FilterType::Triangle), scale)
}

/// Crops `bbox` grown by `padding` of its size on each side, clamped to the
/// image, resizes to a `size` square and JPEG-encodes it.
pub fn crop_thumbnail(
    image: &RgbImage,
    bbox: &BoundingBox,
    padding: f32,
    size: u32,
) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let mx = bbox.width() * padding;
    let my = bbox.height() * padding;

    let x1 = (bbox.x1 - mx).max(0.0) as u32;
    let y1 = (bbox.y1 - my).max(0.0) as u32;
    let x2 = ((bbox.x2 + mx).max(0.0) as u32).min(w);
    let y2 = ((bbox.y2 + my).max(0.0) as u32).min(h);

    if x2 <= x1 || y2 <= y1 {
        return Err(crate::utils::error::PipelineError::Image(format!(
            "face box {:?} lies outside the {}x{} image",
            bbox, w, h
        )));
    }

    let crop = imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image();
    let thumb = imageops::resize(&crop, size, size, FilterType::Triangle);

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90).encode(
        thumb.as_raw(),
        thumb.width(),
        thumb.height(),
        ColorType::Rgb8,
    )?;

    Ok(buf)
}
