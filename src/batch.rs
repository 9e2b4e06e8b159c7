//! Single and batch video runs with an end-of-run summary.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::calibration::RunConfig;
use crate::config::AppConfig;
use crate::log;
use crate::ocr::DigitReader;
use crate::paths::{video_file_name, video_stem};
use crate::pipeline::{process_video, RunOutcome};

/// Video extensions picked up in batch mode (compared case-insensitively).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// Lists the videos in a folder, sorted by file name.
pub fn collect_videos(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(folder)
        .with_context(|| format!("Failed to read folder: {}", folder.display()))?;

    let mut videos: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    VIDEO_EXTENSIONS
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
        })
        .collect();

    videos.sort();
    Ok(videos)
}

/// Calibration file for a video: `<stem>.json` in `calibration_dir`.
pub fn calibration_path_for(video: &Path, calibration_dir: &Path) -> PathBuf {
    calibration_dir.join(format!("{}.json", video_stem(video)))
}

/// Counts of a single or batch run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub total_crossings: usize,
    /// (video, error) for every failed video
    pub failures: Vec<(String, String)>,
}

impl RunSummary {
    pub fn record_success(&mut self, outcome: &RunOutcome) {
        self.attempted += 1;
        self.succeeded += 1;
        self.total_crossings += outcome.report.crossings.len();
    }

    pub fn record_failure(&mut self, video: &Path, error: &anyhow::Error) {
        self.attempted += 1;
        self.failures.push((video_file_name(video), format!("{:#}", error)));
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn log_summary(&self, output_root: &Path) {
        log("=== Processing Complete ===");
        log(&format!("Videos attempted: {}", self.attempted));
        log(&format!("Videos succeeded: {}", self.succeeded));
        log(&format!("Videos failed: {}", self.failed()));
        for (video, error) in &self.failures {
            log(&format!("  {}: {}", video, error));
        }
        log(&format!("Total crossings recorded: {}", self.total_crossings));
        log(&format!(
            "Master report: {}",
            output_root.join(crate::report::master::MASTER_CSV).display()
        ));
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.failures.is_empty() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Loads the calibration and processes one video, recording the result.
pub fn run_one(
    video: &Path,
    calibration: &Path,
    spacing: u32,
    config: &AppConfig,
    reader: &dyn DigitReader,
    summary: &mut RunSummary,
) {
    let result = RunConfig::load(calibration)
        .and_then(|run_config| process_video(video, &run_config, spacing, config, reader));

    match result {
        Ok(outcome) => {
            log(&format!("Outputs written to {}", outcome.run_dir.display()));
            summary.record_success(&outcome);
        }
        Err(e) => {
            log(&format!("Failed: {}: {:#}", video.display(), e));
            summary.record_failure(video, &e);
        }
    }
}

/// Processes every video in `folder` one after another. A failing video is
/// logged and skipped.
pub fn run_batch(
    folder: &Path,
    calibration_dir: &Path,
    spacing: u32,
    config: &AppConfig,
    reader: &dyn DigitReader,
) -> Result<RunSummary> {
    let videos = collect_videos(folder)?;
    log(&format!(
        "Found {} video(s) in {}",
        videos.len(),
        folder.display()
    ));

    let mut summary = RunSummary::default();
    for (i, video) in videos.iter().enumerate() {
        log(&format!("[{}/{}] {}", i + 1, videos.len(), video_file_name(video)));
        let calibration = calibration_path_for(video, calibration_dir);
        run_one(video, &calibration, spacing, config, reader, &mut summary);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::NoReader;
    use tempfile::tempdir;

    #[test]
    fn test_collect_videos_filters_and_sorts() {
        let dir = tempdir().unwrap();
        for name in ["b.MOV", "a.mp4", "c.avi", "notes.txt", "d.json", "e.mkv"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.mp4")).unwrap();

        let videos = collect_videos(dir.path()).unwrap();
        let names: Vec<String> = videos.iter().map(|p| video_file_name(p)).collect();
        assert_eq!(names, vec!["a.mp4", "b.MOV", "c.avi"]);
    }

    #[test]
    fn test_calibration_path_for() {
        let path = calibration_path_for(Path::new("/v/trial 3.mov"), Path::new("/cal"));
        assert_eq!(path, PathBuf::from("/cal/trial 3.json"));
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let dir = tempdir().unwrap();
        let videos = dir.path().join("videos");
        fs::create_dir(&videos).unwrap();
        fs::write(videos.join("a.mp4"), b"").unwrap();
        fs::write(videos.join("b.mp4"), b"").unwrap();

        let config = AppConfig {
            output_dir: dir.path().join("out"),
            ..AppConfig::default()
        };

        // No calibration files: both videos fail, neither aborts the batch
        let summary = run_batch(&videos, &videos, 10, &config, &NoReader).unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.exit_code(), ExitCode::FAILURE);
    }

    #[test]
    fn test_empty_summary_succeeds() {
        let summary = RunSummary::default();
        assert_eq!(summary.exit_code(), ExitCode::SUCCESS);
    }
}
