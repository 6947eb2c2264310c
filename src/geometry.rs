/// Normalized rectangle geometry
///
/// All boxes live in normalized image coordinates: `(0, 0)` is the top-left
/// corner of the frame, `(1, 1)` the bottom-right, and y grows downward.
/// A box may extend outside the unit square (for example after expansion);
/// `clamp` brings it back.
use serde::{Deserialize, Serialize};

use crate::detection::{Detection, Label};

/// Default factor used to grow a hoop box into a detector region of interest
pub const DEFAULT_REGION_EXPAND: f32 = 2.2;

/// Axis-aligned rectangle in normalized coordinates (min corner + size)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a box from its center point and size
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self::new(cx - width / 2.0, cy - height / 2.0, width, height)
    }

    /// The full frame
    pub fn unit() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Whether a point lies inside the box (edges inclusive)
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.max_x() && py >= self.y && py <= self.max_y()
    }

    /// Euclidean distance between the centers of two boxes
    pub fn center_distance(&self, other: &NormBox) -> f32 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// Calculate intersection over union (IoU) with another box
    pub fn iou(&self, other: &NormBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.max_x().min(other.max_x());
        let y2 = self.max_y().min(other.max_y());

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }

        intersection / union
    }

    /// Check if this box overlaps another at all
    pub fn intersects(&self, other: &NormBox) -> bool {
        self.x < other.max_x() && other.x < self.max_x() && self.y < other.max_y() && other.y < self.max_y()
    }
}

/// Horizontal rim segment at the top edge of the hoop box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RimLine {
    pub x_min: f32,
    pub x_max: f32,
    pub y: f32,
}

impl RimLine {
    pub fn from_hoop(hoop: &NormBox) -> Self {
        Self {
            x_min: hoop.x,
            x_max: hoop.max_x(),
            y: hoop.y,
        }
    }
}

/// Scale width and height by `factor` about the box center
pub fn expand(b: &NormBox, factor: f32) -> NormBox {
    let (cx, cy) = b.center();
    NormBox::from_center(cx, cy, b.width * factor, b.height * factor)
}

/// Clip all edges into [0, 1]
///
/// A box that lies fully outside the unit square collapses onto the nearest
/// edge with zero width or height instead of going negative.
pub fn clamp(b: &NormBox) -> NormBox {
    let x0 = b.x.clamp(0.0, 1.0);
    let y0 = b.y.clamp(0.0, 1.0);
    let x1 = b.max_x().clamp(0.0, 1.0);
    let y1 = b.max_y().clamp(0.0, 1.0);
    NormBox::new(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
}

pub fn expand_and_clamp(b: &NormBox, factor: f32) -> NormBox {
    clamp(&expand(b, factor))
}

/// Map a region-relative box back into full-frame coordinates
pub fn to_global(relative: &NormBox, region: &NormBox) -> NormBox {
    NormBox::new(
        region.x + relative.x * region.width,
        region.y + relative.y * region.height,
        relative.width * region.width,
        relative.height * region.height,
    )
}

/// Inverse of [`to_global`]; returns `None` for a degenerate region
pub fn to_local(global: &NormBox, region: &NormBox) -> Option<NormBox> {
    if region.width <= 0.0 || region.height <= 0.0 {
        return None;
    }
    Some(NormBox::new(
        (global.x - region.x) / region.width,
        (global.y - region.y) / region.height,
        global.width / region.width,
        global.height / region.height,
    ))
}

/// Region of interest around an already locked hoop
pub fn derive_region_from_hoop(hoop: &NormBox, expand_factor: Option<f32>) -> NormBox {
    expand_and_clamp(hoop, expand_factor.unwrap_or(DEFAULT_REGION_EXPAND))
}

/// Region of interest from a user-drawn box and the detections around it
///
/// Prefers the most confident hoop detection that overlaps `user_box`;
/// otherwise grows the user box itself.
pub fn derive_region_from_detections(
    detections: &[Detection],
    user_box: &NormBox,
    expand_factor: Option<f32>,
) -> NormBox {
    let factor = expand_factor.unwrap_or(DEFAULT_REGION_EXPAND);

    let hoop = detections
        .iter()
        .filter(|d| d.label == Label::Hoop && d.bbox.intersects(user_box))
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

    match hoop {
        Some(d) => expand_and_clamp(&d.bbox, factor),
        None => expand_and_clamp(user_box, factor),
    }
}
