//! Tube Angle
//!
//! Tracks the tip of a tube swinging across a protractor in recorded videos,
//! reads the pressure display each time the tip crosses a target angle and
//! writes per-run and cross-run reports.

mod batch;
mod calibration;
mod config;
mod crossing;
mod error;
mod ocr;
mod overlay;
mod paths;
mod pipeline;
mod report;
mod tracking;
mod video;

use anyhow::{bail, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use batch::RunSummary;
use calibration::RunConfig;
use config::{get_config, init_config, load_config};
use ocr::{DigitReader, NoReader, TesseractReader};
use report::MasterStore;

const LOG_FILE: &str = "tube_angle.log";

/// Per-run log file that receives a copy of every line while a video is processed.
static SESSION_LOG: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);

    let log_path = paths::get_logs_dir().join(LOG_FILE);
    append_line(&log_path, &line);

    if let Ok(session) = SESSION_LOG.lock() {
        if let Some(path) = session.as_ref() {
            append_line(path, &line);
        }
    }
}

fn append_line(path: &Path, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

/// Starts (`Some`) or stops (`None`) copying log lines into a run folder.
pub fn set_session_log(path: Option<PathBuf>) {
    if let Ok(mut session) = SESSION_LOG.lock() {
        *session = path;
    }
}

#[derive(Parser, Debug)]
#[command(name = "tube-angle", version, about)]
struct Cli {
    /// Config file (default: config.json next to the executable, then in the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process one video
    Single {
        video: PathBuf,
        /// Calibration file (default: <video stem>.json next to the video)
        #[arg(long)]
        calibration: Option<PathBuf>,
        /// Target angle spacing in degrees
        #[arg(short, long)]
        spacing: Option<u32>,
        /// Output root folder
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Process every video in a folder
    Batch {
        folder: PathBuf,
        /// Folder holding <video stem>.json calibration files (default: the video folder)
        #[arg(long)]
        calibration_dir: Option<PathBuf>,
        #[arg(short, long)]
        spacing: Option<u32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Regenerate master_report.csv from master_report.json
    RebuildMaster {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Locate tesseract and download English language data if missing
    SetupOcr,
    /// Write a sample calibration file to edit by hand
    CalibrationTemplate {
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    fn output_override(&self) -> Option<&Path> {
        match self {
            Command::Single { output, .. }
            | Command::Batch { output, .. }
            | Command::RebuildMaster { output } => output.as_deref(),
            Command::SetupOcr | Command::CalibrationTemplate { .. } => None,
        }
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        append_line(&paths::get_logs_dir().join(LOG_FILE), &log_msg);
    }));
}

/// Tesseract when it can be found, otherwise a reader that never reads anything.
fn make_reader() -> Box<dyn DigitReader> {
    match TesseractReader::from_config(&get_config().ocr) {
        Ok(reader) => Box::new(reader),
        Err(e) => {
            log(&format!(
                "Warning: {:#}. Pressure readings will be left empty.",
                e
            ));
            Box::new(NoReader)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut app_config = load_config(cli.config.as_deref())?;
    if let Some(output) = cli.command.output_override() {
        app_config.output_dir = output.to_path_buf();
    }
    init_config(app_config);
    let config = get_config();

    match cli.command {
        Command::Single {
            video,
            calibration,
            spacing,
            ..
        } => {
            paths::ensure_directories(&config.output_dir)?;
            let calibration = calibration.unwrap_or_else(|| video.with_extension("json"));
            let spacing = spacing.unwrap_or(config.default_spacing);
            let reader = make_reader();

            let mut summary = RunSummary::default();
            batch::run_one(
                &video,
                &calibration,
                spacing,
                config,
                reader.as_ref(),
                &mut summary,
            );
            summary.log_summary(&config.output_dir);
            Ok(summary.exit_code())
        }
        Command::Batch {
            folder,
            calibration_dir,
            spacing,
            ..
        } => {
            paths::ensure_directories(&config.output_dir)?;
            let calibration_dir = calibration_dir.unwrap_or_else(|| folder.clone());
            let spacing = spacing.unwrap_or(config.default_spacing);
            let reader = make_reader();

            let summary =
                batch::run_batch(&folder, &calibration_dir, spacing, config, reader.as_ref())?;
            summary.log_summary(&config.output_dir);
            Ok(summary.exit_code())
        }
        Command::RebuildMaster { .. } => {
            let store = MasterStore::open(&config.output_dir);
            if store.reports().is_empty() {
                bail!("No runs recorded in {}", store.json_path().display());
            }
            let rows = store.rebuild_csv()?;
            log(&format!(
                "Rebuilt {} ({} runs, {} rows)",
                store.csv_path().display(),
                store.reports().len(),
                rows
            ));
            Ok(ExitCode::SUCCESS)
        }
        Command::SetupOcr => {
            let tessdata = ocr::ensure_tessdata()?;
            let executable =
                ocr::setup::find_tesseract_executable(config.ocr.tesseract_path.as_deref())?;
            log(&format!("tesseract: {}", executable.display()));
            log(&format!("tessdata: {}", tessdata.display()));
            Ok(ExitCode::SUCCESS)
        }
        Command::CalibrationTemplate { path, force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            RunConfig::template().save(&path)?;
            log(&format!("Calibration template written to {}", path.display()));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    install_panic_hook();
    let cli = Cli::parse();

    // Log directory must exist before the first log line hits the file
    let _ = std::fs::create_dir_all(paths::get_logs_dir());

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}
