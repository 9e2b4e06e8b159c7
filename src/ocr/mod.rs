//! Pressure display reading.
//!
//! crop → grayscale → upscale → adaptive threshold → digit reader. Every
//! failure along the way yields an absent reading; nothing here aborts a run.

pub mod engine;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::TesseractReader;
pub use setup::ensure_tessdata;

use image::{GrayImage, RgbImage};
use std::path::Path;

use crate::calibration::PixelRect;
use crate::config::OcrConfig;
use crate::log;
use preprocess::{crop_region, prepare_for_ocr};

/// Recognizes a single integer in a preprocessed (binary) image.
pub trait DigitReader {
    fn read_digits(&self, img: &GrayImage) -> Option<i64>;
}

/// Reader used when no OCR engine is installed: every reading is absent.
pub struct NoReader;

impl DigitReader for NoReader {
    fn read_digits(&self, _img: &GrayImage) -> Option<i64> {
        None
    }
}

/// Reads the pressure display in `roi` of the given frame.
///
/// When `debug_crop` is set, the colour crop (before thresholding) is saved
/// there; a failed save is logged and does not affect the reading.
pub fn read_pressure(
    frame: &RgbImage,
    roi: &PixelRect,
    config: &OcrConfig,
    reader: &dyn DigitReader,
    debug_crop: Option<&Path>,
) -> Option<i64> {
    let crop = crop_region(frame, roi);
    if crop.width() == 0 || crop.height() == 0 {
        log(&format!(
            "Pressure region ({}, {}, {}x{}) is outside the frame",
            roi.x, roi.y, roi.width, roi.height
        ));
        return None;
    }

    if let Some(path) = debug_crop {
        if let Err(e) = crop.save(path) {
            log(&format!("Failed to save {}: {}", path.display(), e));
        }
    }

    let prepared = prepare_for_ocr(&crop, config);
    reader.read_digits(&prepared)
}
