use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the video file stem used to name per-run outputs.
pub fn video_stem(video_path: &Path) -> String {
    video_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string())
}

/// Returns the video file name (with extension), the key used in the master report.
pub fn video_file_name(video_path: &Path) -> String {
    video_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| video_stem(video_path))
}

/// Returns the per-run output folder: `<output_root>/<stem>[_<run_name>]/`
pub fn get_run_dir(output_root: &Path, video_path: &Path, run_name: Option<&str>) -> PathBuf {
    let stem = video_stem(video_path);
    let folder = match run_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{}_{}", stem, name),
        None => stem,
    };
    output_root.join(folder)
}

/// Returns the debug crop path for a crossing: `pressure_at_<angle>deg.png`
pub fn pressure_crop_path(run_dir: &Path, angle: u32) -> PathBuf {
    run_dir.join(format!("pressure_at_{}deg.png", angle))
}

/// Ensures the log and output directories exist. Call at startup.
pub fn ensure_directories(output_root: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    std::fs::create_dir_all(output_root)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dir_without_name() {
        let dir = get_run_dir(Path::new("out"), Path::new("/videos/trial_01.mp4"), None);
        assert_eq!(dir, PathBuf::from("out/trial_01"));
    }

    #[test]
    fn test_run_dir_with_name() {
        let dir = get_run_dir(Path::new("out"), Path::new("trial_01.mp4"), Some("warm"));
        assert_eq!(dir, PathBuf::from("out/trial_01_warm"));

        // Blank run names are ignored
        let dir = get_run_dir(Path::new("out"), Path::new("trial_01.mp4"), Some("  "));
        assert_eq!(dir, PathBuf::from("out/trial_01"));
    }

    #[test]
    fn test_pressure_crop_path() {
        let path = pressure_crop_path(Path::new("run"), 30);
        assert_eq!(path, PathBuf::from("run/pressure_at_30deg.png"));
    }

    #[test]
    fn test_video_file_name() {
        assert_eq!(video_file_name(Path::new("/a/b/clip.MOV")), "clip.MOV");
        assert_eq!(video_stem(Path::new("/a/b/clip.MOV")), "clip");
    }
}
