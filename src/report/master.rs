//! Cross-run master report.
//!
//! `master_report.json` holds one `RunReport` per video (keyed by file name);
//! `master_report.csv` is a flattened, sorted view regenerated from it after
//! every change.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::export::{write_atomic, write_json};
use super::{RunReport, EXPORT_TIME_FORMAT};
use crate::log;

pub const MASTER_JSON: &str = "master_report.json";
pub const MASTER_CSV: &str = "master_report.csv";

const MASTER_CSV_HEADER: &str =
    "Video,Exported,AngleSpacing,Time(MM:SS),CrossedAngle(deg),Pressure(PSI),StartAngle,EndAngle";

/// Replaces every report for the same video with `report`.
///
/// Afterwards there is exactly one report per `video`.
pub fn merge_report(reports: &mut Vec<RunReport>, report: RunReport) {
    reports.retain(|r| r.video != report.video);
    reports.push(report);
}

/// Reads the master JSON. A missing file is empty; an unreadable or corrupt
/// one is logged and treated as empty.
pub fn load_reports(path: &Path) -> Vec<RunReport> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            log(&format!(
                "Warning: could not read {} ({}), starting a new master report",
                path.display(),
                e
            ));
            return Vec::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(reports) => reports,
        Err(e) => {
            log(&format!(
                "Warning: {} is corrupt ({}), starting a new master report",
                path.display(),
                e
            ));
            Vec::new()
        }
    }
}

fn parse_exported(exported: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(exported.trim(), EXPORT_TIME_FORMAT).ok()
}

/// Newest export first; unparseable timestamps after all valid ones.
fn compare_exported(a: &Option<NaiveDateTime>, b: &Option<NaiveDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Quotes a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn opt_to_string<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Renders the flattened master CSV: one row per crossing, sorted by export
/// time descending then video ascending. Crossing order within a report is kept.
pub fn render_master_csv(reports: &[RunReport]) -> String {
    let mut ordered: Vec<(&RunReport, Option<NaiveDateTime>)> = reports
        .iter()
        .map(|r| (r, parse_exported(&r.exported)))
        .collect();
    ordered.sort_by(|(ra, ta), (rb, tb)| {
        compare_exported(ta, tb).then_with(|| ra.video.cmp(&rb.video))
    });

    let mut out = String::new();
    out.push_str(MASTER_CSV_HEADER);
    out.push('\n');

    for (report, _) in ordered {
        for crossing in &report.crossings {
            let row = [
                csv_field(&report.video),
                csv_field(&report.exported),
                opt_to_string(report.angle_spacing),
                csv_field(&crossing.time),
                crossing.angle.to_string(),
                opt_to_string(crossing.pressure),
                opt_to_string(report.start_angle),
                opt_to_string(report.end_angle),
            ];
            out.push_str(&row.join(","));
            out.push('\n');
        }
    }

    out
}

/// The master report files under an output root.
pub struct MasterStore {
    json_path: PathBuf,
    csv_path: PathBuf,
    reports: Vec<RunReport>,
}

impl MasterStore {
    pub fn open(output_root: &Path) -> Self {
        let json_path = output_root.join(MASTER_JSON);
        let reports = load_reports(&json_path);
        Self {
            json_path,
            csv_path: output_root.join(MASTER_CSV),
            reports,
        }
    }

    pub fn reports(&self) -> &[RunReport] {
        &self.reports
    }

    /// Merges a run report (replace by video) and rewrites both master files.
    pub fn upsert(&mut self, report: RunReport) -> Result<()> {
        merge_report(&mut self.reports, report);
        write_json(&self.json_path, &self.reports)
            .with_context(|| format!("Failed to update {}", self.json_path.display()))?;
        self.rebuild_csv()?;
        Ok(())
    }

    /// Regenerates the master CSV from the loaded reports; returns the row count.
    pub fn rebuild_csv(&self) -> Result<usize> {
        let csv = render_master_csv(&self.reports);
        write_atomic(&self.csv_path, csv.as_bytes())
            .with_context(|| format!("Failed to update {}", self.csv_path.display()))?;
        Ok(self.reports.iter().map(|r| r.crossings.len()).sum())
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
