/// One recorded crossing of a target angle.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossingEvent {
    /// Target angle that fired (calibrated degrees)
    pub target_angle: u32,
    /// Index of the frame in the video (0 = first frame)
    pub frame_index: u64,
    /// Whole seconds into the video
    pub seconds: u64,
    /// Pressure read from the display, if recognition succeeded
    pub pressure: Option<i64>,
}

impl CrossingEvent {
    pub fn new(target_angle: u32, frame_index: u64, fps: f64, pressure: Option<i64>) -> Self {
        Self {
            target_angle,
            frame_index,
            seconds: whole_seconds(frame_index, fps),
            pressure,
        }
    }

    /// Timestamp formatted as `MM:SS`.
    pub fn time_label(&self) -> String {
        format_mm_ss(self.seconds)
    }
}

/// Whole seconds elapsed at a frame (truncated). An unknown frame rate yields 0.
pub fn whole_seconds(frame_index: u64, fps: f64) -> u64 {
    if fps > 0.0 {
        (frame_index as f64 / fps) as u64
    } else {
        0
    }
}

/// Formats seconds as `MM:SS`; minutes are not wrapped into hours.
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_label() {
        let event = CrossingEvent::new(30, 1799, 30.0, Some(12));
        assert_eq!(event.seconds, 59);
        assert_eq!(event.time_label(), "00:59");

        let event = CrossingEvent::new(30, 1800, 30.0, None);
        assert_eq!(event.time_label(), "01:00");
    }

    #[test]
    fn test_fractional_fps() {
        // 29.97 fps: frame 2997 is just short of 100 s
        assert_eq!(whole_seconds(2997, 30000.0 / 1001.0), 99);
        assert_eq!(whole_seconds(3000, 30000.0 / 1001.0), 100);
        assert_eq!(format_mm_ss(100), "01:40");
    }

    #[test]
    fn test_long_videos_keep_counting_minutes() {
        assert_eq!(format_mm_ss(3725), "62:05");
    }

    #[test]
    fn test_unknown_fps() {
        assert_eq!(whole_seconds(500, 0.0), 0);
    }
}
