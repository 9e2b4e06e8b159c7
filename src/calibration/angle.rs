//! Screen-space angles and the protractor coordinate frame.
//!
//! Angles follow the physical convention: measured from the +x axis,
//! increasing counter-clockwise, with screen y inverted (it grows downward).

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Upper end of the calibrated range.
pub const MAX_CALIBRATED_ANGLE: f64 = 180.0;

/// Reference spans narrower than this are treated as no separation at all.
const MIN_SPAN_DEG: f64 = 1e-6;

/// A pixel position in frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Direction of `point` as seen from `pivot`, in degrees [0, 360).
///
/// A point on the pivot yields 0.
pub fn raw_angle(pivot: Point, point: Point) -> f64 {
    let dx = point.x - pivot.x;
    let dy = pivot.y - point.y;
    (dy.atan2(dx).to_degrees() + 360.0) % 360.0
}

/// The calibrated angular frame: pivot plus the raw directions of the 0° and 90° references.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationFrame {
    pub pivot: Point,
    pub angle0: f64,
    pub angle90: f64,
}

impl CalibrationFrame {
    /// Builds the frame from the operator-picked pivot and reference points.
    pub fn from_points(
        pivot: Point,
        zero_ref: Point,
        ninety_ref: Point,
    ) -> Result<Self, ConfigurationError> {
        if zero_ref == pivot {
            return Err(ConfigurationError::ReferenceAtPivot { reference: "0°" });
        }
        if ninety_ref == pivot {
            return Err(ConfigurationError::ReferenceAtPivot { reference: "90°" });
        }
        Self::from_angles(pivot, raw_angle(pivot, zero_ref), raw_angle(pivot, ninety_ref))
    }

    /// Builds the frame from raw reference directions.
    pub fn from_angles(
        pivot: Point,
        angle0: f64,
        angle90: f64,
    ) -> Result<Self, ConfigurationError> {
        let frame = Self {
            pivot,
            angle0,
            angle90,
        };
        if frame.span() < MIN_SPAN_DEG {
            return Err(ConfigurationError::DegenerateSpan { angle0, angle90 });
        }
        Ok(frame)
    }

    /// Counter-clockwise sweep from the 0° reference to the 90° reference, in (0, 360).
    pub fn span(&self) -> f64 {
        let mut a90 = self.angle90;
        if a90 < self.angle0 {
            a90 += 360.0;
        }
        a90 - self.angle0
    }

    /// Maps a raw direction onto the calibrated arc, clamped to [0, 180].
    pub fn map_to_arc(&self, raw: f64) -> f64 {
        let mut angle = raw;
        if angle < self.angle0 {
            angle += 360.0;
        }
        let mapped = MAX_CALIBRATED_ANGLE * (angle - self.angle0) / self.span();
        mapped.clamp(0.0, MAX_CALIBRATED_ANGLE)
    }

    /// Calibrated angle of a pixel position.
    pub fn calibrated_angle(&self, point: Point) -> f64 {
        self.map_to_arc(raw_angle(self.pivot, point))
    }

    /// Screen direction (degrees [0, 360)) at which a calibrated angle lies.
    ///
    /// Inverse of `map_to_arc` inside the arc; used to place overlay markers,
    /// so a marker turns green where the tip reads its angle. The 90° reference
    /// direction reads 180.
    pub fn screen_angle_for(&self, calibrated: f64) -> f64 {
        (self.angle0 + self.span() * calibrated / MAX_CALIBRATED_ANGLE).rem_euclid(360.0)
    }

    /// Pixel position at `radius` from the pivot along a calibrated angle.
    pub fn point_at(&self, calibrated: f64, radius: f64) -> Point {
        let rad = self.screen_angle_for(calibrated).to_radians();
        Point::new(
            self.pivot.x + radius * rad.cos(),
            self.pivot.y - radius * rad.sin(),
        )
    }
}
