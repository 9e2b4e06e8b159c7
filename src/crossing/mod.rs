//! Target angles and crossing detection.

pub mod detector;
pub mod event;
pub mod targets;

pub use detector::{CrossingDetector, DEFAULT_RETRACE_THRESHOLD};
pub use event::CrossingEvent;
pub use targets::TargetAngles;
