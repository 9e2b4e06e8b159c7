//! Per-run crossing CSV.
//!
//! Rows are appended as crossings happen, reopening the file for each write,
//! so a run that dies midway still leaves every crossing found so far.
//!
//! `Frame` is the 0-based index of the decoded video frame. The first frame
//! is processed too, so values are one lower than in outputs of tools that
//! skip it after tracker initialization.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::crossing::CrossingEvent;

pub const RUN_CSV_HEADER: &str = "Frame,Time(MM:SS),CrossedAngle(deg),Pressure(PSI)";

/// Creates (or truncates) the run CSV with its comment preamble and header.
pub fn init_run_csv(path: &Path, video: &str, exported: &str, spacing: u32) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writeln!(file, "# Video: {}", video).context("Failed to write CSV preamble")?;
    writeln!(file, "# Exported: {}", exported).context("Failed to write CSV preamble")?;
    writeln!(file, "# Angle Spacing: {}°", spacing).context("Failed to write CSV preamble")?;
    writeln!(file, "{}", RUN_CSV_HEADER).context("Failed to write CSV header")?;
    Ok(())
}

/// Appends one crossing row. An absent pressure is an empty field.
pub fn append_crossing(path: &Path, event: &CrossingEvent) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open run CSV for append")?;

    let pressure = event.pressure.map(|p| p.to_string()).unwrap_or_default();
    let line = format!(
        "{},{},{},{}",
        event.frame_index,
        event.time_label(),
        event.target_angle,
        pressure
    );

    writeln!(file, "{}", line).context("Failed to write CSV row")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_run_csv_preamble() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("tube_crossings.csv");

        init_run_csv(&csv_path, "clip.mp4", "2024-05-01 10:00:00", 15).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# Video: clip.mp4",
                "# Exported: 2024-05-01 10:00:00",
                "# Angle Spacing: 15°",
                RUN_CSV_HEADER,
            ]
        );
    }

    #[test]
    fn test_append_crossings() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("tube_crossings.csv");
        init_run_csv(&csv_path, "clip.mp4", "2024-05-01 10:00:00", 10).unwrap();

        append_crossing(&csv_path, &CrossingEvent::new(0, 3, 30.0, Some(12))).unwrap();
        append_crossing(&csv_path, &CrossingEvent::new(10, 1830, 30.0, None)).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 6); // preamble + header + 2 rows
        assert_eq!(lines[4], "3,00:00,0,12");
        assert_eq!(lines[5], "1830,01:01,10,");
    }

    #[test]
    fn test_init_truncates_previous_run() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("tube_crossings.csv");
        std::fs::write(&csv_path, "old,data\n").unwrap();

        init_run_csv(&csv_path, "clip.mp4", "2024-05-01 10:00:00", 10).unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(!content.contains("old,data"));
    }
}
