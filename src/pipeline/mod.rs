//! Per-video processing.
//!
//! Validates the run calibration, opens the video, then for every decoded
//! frame: tracker update → calibrated angle → crossing detection → pressure
//! reading on a crossing → annotated output frame. Finishes by writing the
//! run report, the montage and the master report.

pub mod context;

pub use context::RunContext;

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::calibration::{CalibrationFrame, PixelRect, RunConfig};
use crate::config::{AppConfig, OcrConfig};
use crate::crossing::{CrossingDetector, TargetAngles};
use crate::log;
use crate::ocr::DigitReader;
use crate::overlay::{write_montage, MONTAGE_FILE};
use crate::paths::{get_run_dir, video_file_name, video_stem};
use crate::report::csv_writer::init_run_csv;
use crate::report::export::write_json;
use crate::report::{export_timestamp, MasterStore, RunAggregator, RunReport};
use crate::tracking::{BoundingBox, TemplateTracker, Tracker};
use crate::video::{FfmpegReader, FfmpegWriter, FrameSink, FrameSource, NullSink};

pub const RUN_CSV: &str = "tube_crossings.csv";
pub const RUN_REPORT: &str = "run_report.json";
pub const SESSION_LOG: &str = "session.log";

/// Result of one processed video.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub run_dir: PathBuf,
}

/// Routes log lines into the run folder until dropped.
struct SessionLogGuard;

impl SessionLogGuard {
    fn start(run_dir: &Path) -> Self {
        crate::set_session_log(Some(run_dir.join(SESSION_LOG)));
        Self
    }
}

impl Drop for SessionLogGuard {
    fn drop(&mut self) {
        crate::set_session_log(None);
    }
}

/// Everything a run needs that can be checked before touching the video.
pub struct RunPlan {
    video_name: String,
    run_name: Option<String>,
    run_dir: PathBuf,
    output_root: PathBuf,
    calibration: CalibrationFrame,
    targets: TargetAngles,
    retrace_threshold: f64,
    tip_box: PixelRect,
    pressure_roi: PixelRect,
    marker_radius: f64,
    ocr: OcrConfig,
    montage: bool,
}

impl RunPlan {
    /// Validates calibration and spacing, then creates the run folder.
    ///
    /// Configuration defects are reported here, before any frame is decoded.
    pub fn prepare(
        video: &Path,
        run_config: &RunConfig,
        spacing: u32,
        config: &AppConfig,
    ) -> Result<Self> {
        let calibration = run_config.validate()?;
        let targets = TargetAngles::new(spacing)?;
        if !targets.covers_full_range() {
            log(&format!(
                "Warning: spacing {}° does not divide 180°; last target is {}°",
                spacing,
                targets.marks().last().copied().unwrap_or(0)
            ));
        }

        let run_name = run_config
            .run_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let run_dir = get_run_dir(&config.output_dir, video, run_name.as_deref());
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Failed to create {}", run_dir.display()))?;

        Ok(Self {
            video_name: video_file_name(video),
            run_name,
            run_dir,
            output_root: config.output_dir.clone(),
            calibration,
            targets,
            retrace_threshold: config.retrace_threshold,
            tip_box: run_config.tip_box,
            pressure_roi: run_config.pressure_roi,
            marker_radius: run_config.marker_radius(),
            ocr: config.ocr.clone(),
            montage: config.montage,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Runs the frame loop against the given source, tracker and sink, then
    /// writes the per-run outputs and updates the master report.
    pub fn execute(
        self,
        source: &mut dyn FrameSource,
        tracker: &mut dyn Tracker,
        sink: &mut dyn FrameSink,
        reader: &dyn DigitReader,
    ) -> Result<RunOutcome> {
        let exported = export_timestamp();
        let fps = source.info().fps;
        remove_stale_crops(&self.run_dir)?;

        let csv_path = self.run_dir.join(RUN_CSV);
        init_run_csv(&csv_path, &self.video_name, &exported, self.targets.spacing())?;

        let spacing = self.targets.spacing();
        let mut ctx = RunContext::new(
            self.calibration,
            CrossingDetector::new(self.targets, self.retrace_threshold),
            RunAggregator::new(self.video_name.clone(), self.run_name, spacing),
            self.pressure_roi,
            self.marker_radius,
            fps,
            self.ocr.clone(),
            reader,
            &self.run_dir,
        )
        .with_csv(csv_path);

        run_frames(source, tracker, sink, &mut ctx, BoundingBox::from(self.tip_box))?;

        let angles: Vec<u32> = ctx.events().iter().map(|e| e.target_angle).collect();
        let report = ctx.finish(exported);

        write_json(&self.run_dir.join(RUN_REPORT), &report)?;

        if self.montage && self.ocr.save_debug_crops {
            match write_montage(&self.run_dir, &angles) {
                Ok(Some(path)) => log(&format!("Montage saved: {}", path.display())),
                Ok(None) => {}
                Err(e) => log(&format!("Warning: montage failed: {:#}", e)),
            }
        }

        let mut master = MasterStore::open(&self.output_root);
        master.upsert(report.clone())?;

        log(&format!(
            "Processed {} ({} crossings, {} frames{})",
            self.video_name,
            report.crossings.len(),
            report.frames_processed,
            if report.tracking_lost {
                ", tracking lost"
            } else {
                ""
            }
        ));

        Ok(RunOutcome {
            report,
            run_dir: self.run_dir,
        })
    }
}

/// Deletes debug crops and the montage left by an earlier run in the same
/// folder, so only crops written by this run end up in the new montage.
fn remove_stale_crops(run_dir: &Path) -> Result<()> {
    let entries = fs::read_dir(run_dir)
        .with_context(|| format!("Failed to read {}", run_dir.display()))?;

    for path in entries.filter_map(|entry| entry.ok().map(|e| e.path())) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_crop = name
            .strip_prefix("pressure_at_")
            .and_then(|rest| rest.strip_suffix("deg.png"))
            .is_some_and(|angle| !angle.is_empty() && angle.bytes().all(|b| b.is_ascii_digit()));
        if is_crop || name == MONTAGE_FILE {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}

/// Drives the tracker over every frame of the source.
///
/// The first frame initializes the tracker and is processed with the initial
/// box. Tracking loss ends the loop early; the run keeps what it found.
pub fn run_frames(
    source: &mut dyn FrameSource,
    tracker: &mut dyn Tracker,
    sink: &mut dyn FrameSink,
    ctx: &mut RunContext,
    initial_box: BoundingBox,
) -> Result<()> {
    let mut frame = source
        .next_frame()?
        .ok_or_else(|| anyhow!("Video contains no frames"))?;
    tracker
        .init(&frame, initial_box)
        .context("Failed to initialize tracker")?;

    let mut frame_index = 0u64;
    let mut bbox = initial_box;

    loop {
        ctx.process_frame(frame_index, &frame, &bbox)?;
        ctx.annotate(&mut frame, &bbox);
        sink.write_frame(&frame)?;

        frame_index += 1;
        frame = match source.next_frame()? {
            Some(next) => next,
            None => break,
        };
        bbox = match tracker.update(&frame) {
            Some(b) => b,
            None => {
                log(&format!("Tracking lost at frame {}", frame_index));
                ctx.mark_tracking_lost();
                break;
            }
        };
    }

    sink.finish()
}

/// Processes one video file end to end with the ffmpeg and template tracker
/// implementations.
pub fn process_video(
    video: &Path,
    run_config: &RunConfig,
    spacing: u32,
    config: &AppConfig,
    reader: &dyn DigitReader,
) -> Result<RunOutcome> {
    let plan = RunPlan::prepare(video, run_config, spacing, config)
        .with_context(|| format!("Invalid configuration for {}", video.display()))?;
    let _session = SessionLogGuard::start(plan.run_dir());
    log(&format!("Processing {} (spacing {}°)", video.display(), spacing));

    let mut source = FfmpegReader::open(video, &config.video)
        .with_context(|| format!("Failed to open {}", video.display()))?;
    let info = source.info().clone();

    let mut sink: Box<dyn FrameSink> = if config.annotate_video {
        let out_path = plan
            .run_dir()
            .join(format!("{}_annotated.mp4", video_stem(video)));
        Box::new(FfmpegWriter::create(
            &out_path,
            info.width,
            info.height,
            info.fps,
            &config.video,
        )?)
    } else {
        Box::new(NullSink)
    };

    let mut tracker = TemplateTracker::new(config.tracker.clone());
    plan.execute(&mut source, &mut tracker, sink.as_mut(), reader)
}
