//! Application settings.
//!
//! Loads settings from config.json at startup. Provides OCR preprocessing
//! parameters, tracker tuning, external tool paths and output locations.
//! Per-video calibration lives in a separate file (see `calibration::RunConfig`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::crossing::DEFAULT_RETRACE_THRESHOLD;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Pressure display OCR settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Neighbourhood size for adaptive thresholding (odd, in upscaled pixels)
    pub block_size: u32,
    /// Constant subtracted from the neighbourhood mean
    pub offset: i32,
    /// Integer upscale factor applied before thresholding
    pub upscale: u32,
    /// Tesseract page segmentation mode (7 = single text line)
    pub psm: u8,
    /// Explicit path to the tesseract executable
    pub tesseract_path: Option<PathBuf>,
    /// Save the cropped display region for every crossing
    pub save_debug_crops: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            block_size: 31,
            offset: 15,
            upscale: 2,
            psm: 7,
            tesseract_path: None,
            save_debug_crops: true,
        }
    }
}

/// Template tracker settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Pixels searched around the previous box on every frame
    pub search_margin: u32,
    /// Correlation score below which the target is considered lost (0.0-1.0)
    pub min_score: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            search_margin: 32,
            min_score: 0.35,
        }
    }
}

/// ffmpeg / ffprobe settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// x264 constant rate factor for the annotated video
    pub crf: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            crf: 20,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root folder for per-run folders and the master report
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Angle spacing used when none is given on the command line
    #[serde(default = "default_spacing")]
    pub default_spacing: u32,
    /// Degrees the tip must have moved past a target before it can fire again
    #[serde(default = "default_retrace_threshold")]
    pub retrace_threshold: f64,
    /// Write the annotated video
    #[serde(default = "default_true")]
    pub annotate_video: bool,
    /// Write pressure_montage.png after each run
    #[serde(default = "default_true")]
    pub montage: bool,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub video: VideoConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("AnnotatedResults")
}

fn default_spacing() -> u32 {
    10
}

fn default_retrace_threshold() -> f64 {
    DEFAULT_RETRACE_THRESHOLD
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            default_spacing: default_spacing(),
            retrace_threshold: default_retrace_threshold(),
            annotate_video: true,
            montage: true,
            ocr: OcrConfig::default(),
            tracker: TrackerConfig::default(),
            video: VideoConfig::default(),
        }
    }
}

/// Parses a config file.
pub fn read_config_file(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Loads configuration.
///
/// An explicitly requested file must exist and parse. Otherwise config.json is
/// looked up next to the executable, then in the working directory, and the
/// defaults are used when neither is usable.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        let config = read_config_file(path)?;
        crate::log(&format!("Config loaded from {}", path.display()));
        return Ok(config);
    }

    let candidates = [
        crate::paths::get_exe_dir().join("config.json"),
        PathBuf::from("config.json"),
    ];

    if let Some(config_path) = candidates.iter().find(|p| p.exists()) {
        return match read_config_file(config_path) {
            Ok(config) => {
                crate::log(&format!("Config loaded from {}", config_path.display()));
                Ok(config)
            }
            Err(e) => {
                crate::log(&format!("{:#}. Using defaults.", e));
                Ok(AppConfig::default())
            }
        };
    }

    crate::log("config.json not found. Using default config.");
    Ok(AppConfig::default())
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config(config: AppConfig) {
    let _ = CONFIG.set(config);
}

/// Returns a reference to the global configuration (defaults if never initialized).
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}
