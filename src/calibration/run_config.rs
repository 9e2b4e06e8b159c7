//! Per-video calibration file.
//!
//! Produced by the (external) interactive calibration step: pivot, the two
//! reference points, the tip tracking box and the pressure display region,
//! all in pixel coordinates of the first frame.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::angle::{CalibrationFrame, Point};
use crate::error::ConfigurationError;
use crate::report::export::write_json;

/// A rectangle in absolute pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    /// X position of top-left corner
    pub x: u32,
    /// Y position of top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersects the rectangle with an image of the given size.
    pub fn clamp_to(&self, img_w: u32, img_h: u32) -> PixelRect {
        let x = self.x.min(img_w);
        let y = self.y.min(img_h);
        PixelRect {
            x,
            y,
            width: self.width.min(img_w - x),
            height: self.height.min(img_h - y),
        }
    }
}

/// Calibration and regions of interest for one video.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Optional label appended to the run folder name
    #[serde(default)]
    pub run_name: Option<String>,
    /// Protractor origin
    pub pivot: Point,
    /// Tube tip as clicked by the operator (informational)
    #[serde(default)]
    pub tip_point: Option<Point>,
    /// Point on the 0° line
    pub zero_ref: Point,
    /// Point on the 90° line
    pub ninety_ref: Point,
    /// Initial tracking box around the tube tip
    pub tip_box: PixelRect,
    /// Region around the protractor; its width sets the overlay marker radius
    #[serde(default)]
    pub protractor_roi: Option<PixelRect>,
    /// Region around the pressure display
    pub pressure_roi: PixelRect,
}

impl RunConfig {
    /// Loads a calibration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read calibration file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse calibration file: {}", path.display()))
    }

    /// Writes the calibration file (pretty-printed).
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
            .with_context(|| format!("Failed to write calibration file: {}", path.display()))
    }

    /// A filled-in sample for a 640x480 recording, with the 0° line pointing
    /// right and 90° straight up.
    pub fn template() -> Self {
        Self {
            run_name: None,
            pivot: Point::new(320.0, 400.0),
            tip_point: Some(Point::new(420.0, 400.0)),
            zero_ref: Point::new(500.0, 400.0),
            ninety_ref: Point::new(320.0, 220.0),
            tip_box: PixelRect::new(405, 385, 30, 30),
            protractor_roi: Some(PixelRect::new(100, 150, 450, 260)),
            pressure_roi: PixelRect::new(10, 10, 120, 40),
        }
    }

    /// Checks the configuration and builds the angular frame.
    ///
    /// Every defect here is fatal for the run and must surface before any frame is read.
    pub fn validate(&self) -> Result<CalibrationFrame, ConfigurationError> {
        if self.tip_box.is_empty() {
            return Err(ConfigurationError::EmptyRegion { region: "tip_box" });
        }
        if self.pressure_roi.is_empty() {
            return Err(ConfigurationError::EmptyRegion {
                region: "pressure_roi",
            });
        }
        CalibrationFrame::from_points(self.pivot, self.zero_ref, self.ninety_ref)
    }

    /// Radius at which target markers are drawn.
    ///
    /// Two thirds of the protractor region width, or the distance to the
    /// 0° reference when no protractor region was selected.
    pub fn marker_radius(&self) -> f64 {
        match self.protractor_roi {
            Some(roi) if roi.width > 0 => roi.width as f64 / 1.5,
            _ => self.pivot.distance_to(&self.zero_ref),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_config() -> RunConfig {
        RunConfig::template()
    }

    #[test]
    fn test_valid_config() {
        let frame = sample_config().validate().unwrap();
        assert!((frame.angle0 - 0.0).abs() < 1e-9);
        assert!((frame.angle90 - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_regions_rejected() {
        let mut config = sample_config();
        config.pressure_roi.width = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::EmptyRegion {
                region: "pressure_roi"
            })
        );

        let mut config = sample_config();
        config.tip_box.height = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::EmptyRegion { region: "tip_box" })
        );
    }

    #[test]
    fn test_pivot_reference_rejected() {
        let mut config = sample_config();
        config.ninety_ref = config.pivot;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::ReferenceAtPivot { .. })
        ));
    }

    #[test]
    fn test_marker_radius() {
        let mut config = sample_config();
        assert!((config.marker_radius() - 300.0).abs() < 1e-9);

        config.protractor_roi = None;
        assert!((config.marker_radius() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trial.json");

        let mut config = sample_config();
        config.run_name = Some("warm".to_string());
        config.save(&path).unwrap();

        let loaded = RunConfig::load(&path).unwrap();
        assert_eq!(loaded.run_name.as_deref(), Some("warm"));
        assert_eq!(loaded.pressure_roi, config.pressure_roi);
    }

    #[test]
    fn test_minimal_file_parses() {
        let json = r#"{
            "pivot": {"x": 10, "y": 20},
            "zero_ref": {"x": 50, "y": 20},
            "ninety_ref": {"x": 10, "y": 0},
            "tip_box": {"x": 1, "y": 2, "width": 3, "height": 4},
            "pressure_roi": {"x": 0, "y": 0, "width": 8, "height": 8}
        }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert!(config.run_name.is_none());
        assert!(config.protractor_roi.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_clamp_to_image() {
        let rect = PixelRect::new(90, 95, 50, 50).clamp_to(100, 100);
        assert_eq!(rect, PixelRect::new(90, 95, 10, 5));

        let outside = PixelRect::new(200, 200, 10, 10).clamp_to(100, 100);
        assert!(outside.is_empty());
    }
}
