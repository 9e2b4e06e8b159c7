//! Annotation of output frames and the pressure crop montage.

pub mod draw;
pub mod glyphs;
pub mod montage;

pub use montage::{write_montage, MONTAGE_FILE};

use image::{Rgb, RgbImage};

use crate::calibration::CalibrationFrame;
use crate::crossing::CrossingDetector;
use crate::tracking::BoundingBox;
use draw::{draw_rect, fill_circle};
use glyphs::{draw_text, GLYPH_HEIGHT};

/// Target already crossed
pub const COLOR_CROSSED: Rgb<u8> = Rgb([0, 255, 0]);
/// Target not yet crossed
pub const COLOR_PENDING: Rgb<u8> = Rgb([255, 0, 0]);
pub const COLOR_TRACKER: Rgb<u8> = Rgb([0, 0, 255]);

const MARKER_RADIUS: u32 = 3;
const LABEL_OFFSET: i64 = 5;
const TRACKER_THICKNESS: u32 = 2;

/// Draws one dot per target along the protractor arc, with its number.
pub fn draw_markers(
    img: &mut RgbImage,
    calibration: &CalibrationFrame,
    detector: &CrossingDetector,
    radius: f64,
) {
    for &mark in detector.targets().marks() {
        let p = calibration.point_at(mark as f64, radius);
        let (px, py) = (p.x as i64, p.y as i64);
        let color = if detector.is_crossed(mark) {
            COLOR_CROSSED
        } else {
            COLOR_PENDING
        };

        fill_circle(img, px, py, MARKER_RADIUS, color);
        // Label sits up and to the right of the dot
        draw_text(
            img,
            px + LABEL_OFFSET,
            py - LABEL_OFFSET - GLYPH_HEIGHT as i64,
            &mark.to_string(),
            1,
            color,
        );
    }
}

/// Outlines the tracked box.
pub fn draw_tracker_box(img: &mut RgbImage, bbox: &BoundingBox) {
    draw_rect(
        img,
        bbox.x as i64,
        bbox.y as i64,
        bbox.width.max(0.0) as u32,
        bbox.height.max(0.0) as u32,
        COLOR_TRACKER,
        TRACKER_THICKNESS,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Point;
    use crate::crossing::{TargetAngles, DEFAULT_RETRACE_THRESHOLD};

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn calibration() -> CalibrationFrame {
        // 0° to the right, 90° straight up: calibrated 180 is straight up
        CalibrationFrame::from_points(
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(100.0, 0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_marker_colors_follow_crossings() {
        let mut detector =
            CrossingDetector::new(TargetAngles::new(90).unwrap(), DEFAULT_RETRACE_THRESHOLD);
        detector.update(0.0);

        let mut img = RgbImage::from_pixel(200, 200, BLACK);
        draw_markers(&mut img, &calibration(), &detector, 50.0);

        // Mark 0 at (150, 100) crossed, mark 180 at (100, 50) pending
        assert_eq!(*img.get_pixel(150, 100), COLOR_CROSSED);
        assert_eq!(*img.get_pixel(100, 50), COLOR_PENDING);
        // Mark 90 at 45° on screen: (135, 64)
        assert_eq!(*img.get_pixel(135, 64), COLOR_PENDING);
    }

    #[test]
    fn test_tracker_box_outline() {
        let mut img = RgbImage::from_pixel(50, 50, BLACK);
        draw_tracker_box(&mut img, &BoundingBox::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(*img.get_pixel(10, 10), COLOR_TRACKER);
        assert_eq!(*img.get_pixel(29, 29), COLOR_TRACKER);
        assert_eq!(*img.get_pixel(20, 20), BLACK);
    }
}
