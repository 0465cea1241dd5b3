//! Box geometry: conversion between corner boxes and the `[x, y, s, r]`
//! measurement used by the motion filter, plus IoU.

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

use crate::error::{FootfallError, Result};

/// Measurement vector `[x, y, s, r]`: centroid, area and aspect ratio.
pub type Measurement = SVector<f32, 4>;

/// Axis-aligned box in pixel coordinates, top-left `(x1, y1)` to
/// bottom-right `(x2, y2)`.
///
/// Serialized as a plain `[x1, y1, x2, y2]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Geometric center `(cx, cy)`.
    pub fn centroid(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }

    /// True when every coordinate is finite and the box has strictly
    /// positive width and height.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.width() > 0.0 && self.height() > 0.0
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f32; 4]> for BBox {
    fn from(a: [f32; 4]) -> Self {
        BBox::new(a[0], a[1], a[2], a[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        b.to_array()
    }
}

/// Convert a corner box to `[x, y, s, r]`.
pub fn bbox_to_state(bbox: &BBox) -> Result<Measurement> {
    if !bbox.is_valid() {
        return Err(FootfallError::DegenerateBox {
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
        });
    }
    let w = bbox.width();
    let h = bbox.height();
    Ok(Measurement::new(bbox.x1 + w / 2.0, bbox.y1 + h / 2.0, w * h, w / h))
}

/// Convert `[x, y, s, r]` back to a corner box.
///
/// A non-positive `s * r` yields non-finite coordinates; callers check
/// [`BBox::is_finite`] instead of relying on a panic here.
pub fn state_to_bbox(state: &Measurement) -> BBox {
    let (x, y, s, r) = (state[0], state[1], state[2], state[3]);
    let w = (s * r).sqrt();
    let h = s / w;
    BBox::new(x - w / 2.0, y - h / 2.0, x + w / 2.0, y + h / 2.0)
}

/// Intersection over union of two boxes, in `[0, 1]`.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let a_area = a.area();
    let b_area = b.area();
    if !(a_area > 0.0) || !(b_area > 0.0) {
        return 0.0;
    }

    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a_area + b_area - inter_area;
    if union <= 0.0 {
        return 0.0;
    }

    (inter_area / union).clamp(0.0, 1.0)
}
