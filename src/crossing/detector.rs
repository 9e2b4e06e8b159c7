//! Target-crossing detection with retrace hysteresis.
//!
//! A target fires the first time the tip comes within tolerance of it. It
//! re-arms only once the most recently fired target lies more than the
//! retrace threshold above it, so jitter around one mark never fires twice
//! but a real back-and-forth sweep does.

use std::collections::BTreeSet;

use super::targets::TargetAngles;

/// Default retrace threshold in calibrated degrees.
pub const DEFAULT_RETRACE_THRESHOLD: f64 = 10.0;

/// Per-run crossing state. Create one per video.
#[derive(Clone, Debug)]
pub struct CrossingDetector {
    targets: TargetAngles,
    retrace_threshold: f64,
    crossed: BTreeSet<u32>,
    last_crossed: Option<u32>,
}

impl CrossingDetector {
    pub fn new(targets: TargetAngles, retrace_threshold: f64) -> Self {
        Self {
            targets,
            retrace_threshold,
            crossed: BTreeSet::new(),
            last_crossed: None,
        }
    }

    /// Evaluates one frame's calibrated angle.
    ///
    /// Returns the targets that fired, in ascending order. `last_crossed` is
    /// updated as each one fires, so later targets in the same frame see it.
    pub fn update(&mut self, current: f64) -> Vec<u32> {
        let tolerance = self.targets.tolerance();
        let mut fired = Vec::new();

        for &mark in self.targets.marks() {
            if (current - mark as f64).abs() > tolerance {
                continue;
            }
            if self.is_armed(mark) {
                self.crossed.insert(mark);
                self.last_crossed = Some(mark);
                fired.push(mark);
            }
        }

        fired
    }

    /// A target is armed if it never fired, or the tip has since fired a
    /// target more than the retrace threshold beyond it.
    fn is_armed(&self, mark: u32) -> bool {
        if !self.crossed.contains(&mark) {
            return true;
        }
        match self.last_crossed {
            Some(last) => (mark as f64) < last as f64 - self.retrace_threshold,
            None => false,
        }
    }

    pub fn targets(&self) -> &TargetAngles {
        &self.targets
    }

    pub fn is_crossed(&self, mark: u32) -> bool {
        self.crossed.contains(&mark)
    }
}
