use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";
const TRAINEDDATA: &str = "eng.traineddata";

const COMMON_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

const SYSTEM_TESSDATA: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

/// Returns the directory for locally downloaded Tesseract data.
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tube-angle")
        .join("tesseract")
}

/// Finds the tesseract executable.
///
/// Order: explicit path from the settings, `TESSERACT_CMD`, `PATH`, then
/// common install locations.
pub fn find_tesseract_executable(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(anyhow!(
            "Configured tesseract_path does not exist: {}",
            path.display()
        ));
    }

    if let Ok(cmd) = std::env::var("TESSERACT_CMD") {
        let p = PathBuf::from(cmd);
        if responds_to_version(&p) {
            return Ok(p);
        }
    }

    let on_path = PathBuf::from("tesseract");
    if responds_to_version(&on_path) {
        return Ok(on_path);
    }

    COMMON_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| anyhow!("Tesseract not found. Please install Tesseract-OCR."))
}

fn responds_to_version(executable: &Path) -> bool {
    Command::new(executable)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Returns the tessdata directory under `prefix` holding the English model.
///
/// Accepts the directory itself or a parent containing `tessdata/`, the two
/// conventions `TESSDATA_PREFIX` is set with.
pub fn tessdata_under(prefix: &Path) -> Option<PathBuf> {
    if prefix.join(TRAINEDDATA).exists() {
        return Some(prefix.to_path_buf());
    }
    let nested = prefix.join("tessdata");
    if nested.join(TRAINEDDATA).exists() {
        return Some(nested);
    }
    None
}

/// Finds a tessdata directory containing `eng.traineddata`.
pub fn find_tessdata_dir() -> Result<PathBuf> {
    if let Some(dir) = tessdata_under(&get_tesseract_dir()) {
        return Ok(dir);
    }

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        if let Some(dir) = tessdata_under(Path::new(&prefix)) {
            return Ok(dir);
        }
    }

    SYSTEM_TESSDATA
        .iter()
        .filter_map(|p| tessdata_under(Path::new(p)))
        .next()
        .ok_or_else(|| anyhow!("tessdata directory not found (no {} available)", TRAINEDDATA))
}

/// Ensures `eng.traineddata` is available, downloading it into the local
/// data directory when no installation provides it.
pub fn ensure_tessdata() -> Result<PathBuf> {
    if let Ok(dir) = find_tessdata_dir() {
        log(&format!("tessdata found at: {}", dir.display()));
        return Ok(dir);
    }

    let tessdata_dir = get_tesseract_dir().join("tessdata");
    log("tessdata not found locally, downloading...");
    download_tessdata(&tessdata_dir)?;
    Ok(tessdata_dir)
}

/// Downloads English trained data into `tessdata_dir`.
fn download_tessdata(tessdata_dir: &Path) -> Result<()> {
    fs::create_dir_all(tessdata_dir)
        .with_context(|| format!("Failed to create {}", tessdata_dir.display()))?;

    let url = format!("{}/{}", TESSDATA_REPO, TRAINEDDATA);
    log(&format!("Downloading {}...", url));

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "tube-angle")
        .send()
        .context("Failed to request eng.traineddata")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            TRAINEDDATA,
            response.status()
        ));
    }

    let bytes = response.bytes()?;

    // Temp file in the same directory, renamed into place once complete
    let mut temp = NamedTempFile::new_in(tessdata_dir)?;
    temp.write_all(&bytes)?;
    temp.persist(tessdata_dir.join(TRAINEDDATA))
        .map_err(|e| anyhow!("Failed to save {}: {}", TRAINEDDATA, e))?;

    log(&format!("Downloaded {} ({} bytes)", TRAINEDDATA, bytes.len()));
    Ok(())
}
