//! Protractor calibration and pixel-to-angle mapping.
//!
//! The interactive picking of points happens elsewhere; this module consumes
//! its output (a per-video JSON file) and turns it into a validated frame.

pub mod angle;
pub mod run_config;

pub use angle::{CalibrationFrame, Point};
pub use run_config::{PixelRect, RunConfig};
