use super::{CrossingRecord, RunReport};
use crate::crossing::CrossingEvent;

/// Collects per-frame angles and crossing events for one video.
#[derive(Debug)]
pub struct RunAggregator {
    video: String,
    run_name: Option<String>,
    spacing: u32,
    start_angle: Option<f64>,
    end_angle: Option<f64>,
    events: Vec<CrossingEvent>,
    frames_processed: u64,
    tracking_lost: bool,
}

impl RunAggregator {
    pub fn new(video: impl Into<String>, run_name: Option<String>, spacing: u32) -> Self {
        Self {
            video: video.into(),
            run_name,
            spacing,
            start_angle: None,
            end_angle: None,
            events: Vec::new(),
            frames_processed: 0,
            tracking_lost: false,
        }
    }

    /// Notes the calibrated angle of a tracked frame.
    pub fn observe_angle(&mut self, angle: f64) {
        if self.start_angle.is_none() {
            self.start_angle = Some(angle);
        }
        self.end_angle = Some(angle);
        self.frames_processed += 1;
    }

    pub fn record(&mut self, event: CrossingEvent) {
        self.events.push(event);
    }

    pub fn mark_tracking_lost(&mut self) {
        self.tracking_lost = true;
    }

    /// Events in firing order.
    pub fn events(&self) -> &[CrossingEvent] {
        &self.events
    }

    pub fn finish(self, exported: String) -> RunReport {
        RunReport {
            video: self.video,
            exported,
            angle_spacing: Some(self.spacing),
            start_angle: self.start_angle,
            end_angle: self.end_angle,
            crossings: self.events.iter().map(CrossingRecord::from).collect(),
            run_name: self.run_name,
            frames_processed: self.frames_processed,
            tracking_lost: self.tracking_lost,
        }
    }
}
