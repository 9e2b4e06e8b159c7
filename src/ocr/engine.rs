use anyhow::{anyhow, Context, Result};
use image::GrayImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::extract::parse_reading;
use super::setup::{find_tessdata_dir, find_tesseract_executable};
use super::DigitReader;
use crate::config::OcrConfig;
use crate::log;

const DIGIT_WHITELIST: &str = "0123456789";

/// Digit reader backed by the tesseract command-line tool.
pub struct TesseractReader {
    executable: PathBuf,
    tessdata: Option<PathBuf>,
    psm: u8,
}

impl TesseractReader {
    pub fn new(executable: PathBuf, tessdata: Option<PathBuf>, psm: u8) -> Self {
        Self {
            executable,
            tessdata,
            psm,
        }
    }

    /// Locates tesseract and its language data using the OCR settings.
    ///
    /// A missing tessdata directory is not an error: tesseract then falls
    /// back to its compiled-in location.
    pub fn from_config(config: &OcrConfig) -> Result<Self> {
        let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;
        let tessdata = match find_tessdata_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                log(&format!("{}; using tesseract's default tessdata", e));
                None
            }
        };
        log(&format!("Using tesseract at: {}", executable.display()));
        Ok(Self::new(executable, tessdata, config.psm))
    }

    /// Runs tesseract on the image and returns its raw stdout text.
    pub fn recognize(&self, img: &GrayImage) -> Result<String> {
        let temp_input =
            NamedTempFile::with_suffix(".png").context("Failed to create temp image file")?;
        img.save(temp_input.path())
            .context("Failed to write temp image for tesseract")?;

        let mut command = Command::new(&self.executable);
        command
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg("eng")
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", DIGIT_WHITELIST));
        if let Some(dir) = &self.tessdata {
            command.arg("--tessdata-dir").arg(dir);
        }

        let output = command
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl DigitReader for TesseractReader {
    fn read_digits(&self, img: &GrayImage) -> Option<i64> {
        match self.recognize(img) {
            Ok(text) => {
                let reading = parse_reading(&text);
                if reading.is_none() && !text.trim().is_empty() {
                    log(&format!("OCR text not a number: {:?}", text.trim()));
                }
                reading
            }
            Err(e) => {
                log(&format!("OCR failed: {:#}", e));
                None
            }
        }
    }
}
