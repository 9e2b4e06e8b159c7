use anyhow::Result;
use image::RgbImage;
use std::path::{Path, PathBuf};

use crate::calibration::{CalibrationFrame, PixelRect};
use crate::config::OcrConfig;
use crate::crossing::{CrossingDetector, CrossingEvent};
use crate::ocr::{read_pressure, DigitReader};
use crate::overlay::{draw_markers, draw_tracker_box};
use crate::paths::pressure_crop_path;
use crate::report::csv_writer::append_crossing;
use crate::report::{RunAggregator, RunReport};
use crate::tracking::BoundingBox;

/// Mutable state of one video run: crossing detection, pressure reading and
/// report accumulation for each tracked frame.
pub struct RunContext<'a> {
    calibration: CalibrationFrame,
    detector: CrossingDetector,
    aggregator: RunAggregator,
    pressure_roi: PixelRect,
    marker_radius: f64,
    fps: f64,
    ocr: OcrConfig,
    reader: &'a dyn DigitReader,
    run_dir: PathBuf,
    csv_path: Option<PathBuf>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        calibration: CalibrationFrame,
        detector: CrossingDetector,
        aggregator: RunAggregator,
        pressure_roi: PixelRect,
        marker_radius: f64,
        fps: f64,
        ocr: OcrConfig,
        reader: &'a dyn DigitReader,
        run_dir: &Path,
    ) -> Self {
        Self {
            calibration,
            detector,
            aggregator,
            pressure_roi,
            marker_radius,
            fps,
            ocr,
            reader,
            run_dir: run_dir.to_path_buf(),
            csv_path: None,
        }
    }

    /// Appends each crossing to this CSV as it happens.
    pub fn with_csv(mut self, path: PathBuf) -> Self {
        self.csv_path = Some(path);
        self
    }

    /// Maps the box centre to a calibrated angle, runs crossing detection and
    /// reads the pressure for every target that fired.
    pub fn process_frame(
        &mut self,
        frame_index: u64,
        frame: &RgbImage,
        bbox: &BoundingBox,
    ) -> Result<Vec<CrossingEvent>> {
        let angle = self.calibration.calibrated_angle(bbox.center());
        self.aggregator.observe_angle(angle);

        let mut events = Vec::new();
        for mark in self.detector.update(angle) {
            let crop_path = self
                .ocr
                .save_debug_crops
                .then(|| pressure_crop_path(&self.run_dir, mark));
            let pressure = read_pressure(
                frame,
                &self.pressure_roi,
                &self.ocr,
                self.reader,
                crop_path.as_deref(),
            );

            let event = CrossingEvent::new(mark, frame_index, self.fps, pressure);
            crate::log(&format!(
                "Crossed {}° at {} (frame {}), pressure: {}",
                mark,
                event.time_label(),
                frame_index,
                pressure
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string())
            ));

            if let Some(path) = &self.csv_path {
                append_crossing(path, &event)?;
            }
            self.aggregator.record(event.clone());
            events.push(event);
        }

        Ok(events)
    }

    /// Draws the target markers and the tracker box on an output frame.
    pub fn annotate(&self, frame: &mut RgbImage, bbox: &BoundingBox) {
        draw_markers(frame, &self.calibration, &self.detector, self.marker_radius);
        draw_tracker_box(frame, bbox);
    }

    pub fn mark_tracking_lost(&mut self) {
        self.aggregator.mark_tracking_lost();
    }

    pub fn events(&self) -> &[CrossingEvent] {
        self.aggregator.events()
    }

    pub fn finish(self, exported: String) -> RunReport {
        self.aggregator.finish(exported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Point;
    use crate::crossing::{TargetAngles, DEFAULT_RETRACE_THRESHOLD};
    use image::{GrayImage, Rgb};
    use tempfile::tempdir;

    struct Always(i64);

    impl DigitReader for Always {
        fn read_digits(&self, _img: &GrayImage) -> Option<i64> {
            Some(self.0)
        }
    }

    fn context<'a>(reader: &'a dyn DigitReader, run_dir: &Path) -> RunContext<'a> {
        let calibration = CalibrationFrame::from_points(
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(100.0, 0.0),
        )
        .unwrap();
        RunContext::new(
            calibration,
            CrossingDetector::new(TargetAngles::new(30).unwrap(), DEFAULT_RETRACE_THRESHOLD),
            RunAggregator::new("clip.mp4", None, 30),
            PixelRect::new(0, 0, 8, 8),
            50.0,
            10.0,
            OcrConfig::default(),
            reader,
            run_dir,
        )
    }

    /// 10x10 box whose centre sits at the given point.
    fn box_at(x: f64, y: f64) -> BoundingBox {
        BoundingBox::centered_at(Point::new(x, y), 10.0, 10.0)
    }

    #[test]
    fn test_crossing_reads_pressure_and_saves_crop() {
        let dir = tempdir().unwrap();
        let reader = Always(42);
        let mut ctx = context(&reader, dir.path());
        let frame = RgbImage::from_pixel(16, 16, Rgb([200, 200, 200]));

        // Tip on the 0° line
        let events = ctx.process_frame(5, &frame, &box_at(180.0, 100.0)).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target_angle, 0);
        assert_eq!(events[0].frame_index, 5);
        assert_eq!(events[0].pressure, Some(42));
        assert!(pressure_crop_path(dir.path(), 0).exists());
    }

    #[test]
    fn test_already_crossed_target_records_angle_only() {
        let dir = tempdir().unwrap();
        let reader = Always(1);
        let mut ctx = context(&reader, dir.path());
        let frame = RgbImage::new(16, 16);

        ctx.process_frame(0, &frame, &box_at(180.0, 100.0)).unwrap();
        // Still inside the window of the 0° target, which already fired
        let p = CalibrationFrame::from_points(
            Point::new(100.0, 100.0),
            Point::new(200.0, 100.0),
            Point::new(100.0, 0.0),
        )
        .unwrap()
        .point_at(5.0, 80.0);
        let events = ctx.process_frame(1, &frame, &box_at(p.x, p.y)).unwrap();

        assert!(events.is_empty());
        let report = ctx.finish(String::new());
        assert_eq!(report.frames_processed, 2);
        assert_eq!(report.crossings.len(), 1);
    }

    #[test]
    fn test_crossings_appended_to_csv() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("tube_crossings.csv");
        let reader = Always(7);
        let mut ctx = context(&reader, dir.path()).with_csv(csv_path.clone());

        ctx.process_frame(20, &RgbImage::new(16, 16), &box_at(180.0, 100.0))
            .unwrap();

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content.trim(), "20,00:02,0,7");
    }
}
