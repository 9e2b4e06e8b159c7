//! Single-object visual tracking.
//!
//! The pipeline only depends on the `Tracker` trait: initialize once with the
//! operator's box on the first frame, then ask for an updated box on every
//! following frame. `None` means the target was lost, which ends the run.

pub mod template;

pub use template::TemplateTracker;

use anyhow::Result;
use image::RgbImage;

use crate::calibration::{PixelRect, Point};

/// A tracked box in pixel coordinates (may be fractional).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box centre truncated to whole pixels.
    pub fn center(&self) -> Point {
        Point::new(
            (self.x + self.width / 2.0).trunc(),
            (self.y + self.height / 2.0).trunc(),
        )
    }

    /// Box centred on a point.
    #[cfg(test)]
    pub fn centered_at(center: Point, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            width,
            height,
        )
    }
}

impl From<PixelRect> for BoundingBox {
    fn from(rect: PixelRect) -> Self {
        Self::new(
            rect.x as f64,
            rect.y as f64,
            rect.width as f64,
            rect.height as f64,
        )
    }
}

/// Capability interface for a single-object tracker.
pub trait Tracker {
    /// Starts tracking `bbox` on `frame`.
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> Result<()>;

    /// Locates the target on the next frame, or returns `None` if it was lost.
    fn update(&mut self, frame: &RgbImage) -> Option<BoundingBox>;
}
