//! Evenly spaced target angles over the calibrated 0–180° range.

use crate::calibration::angle::MAX_CALIBRATED_ANGLE;
use crate::error::ConfigurationError;

/// Target angles `0, S, 2S, … ≤ 180` with a tolerance of `S / 2`.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetAngles {
    marks: Vec<u32>,
    spacing: u32,
    tolerance: f64,
}

impl TargetAngles {
    /// Builds the target set for a spacing in whole degrees.
    ///
    /// A spacing that does not divide 180 is accepted; the last target is
    /// then the largest multiple below 180.
    pub fn new(spacing: u32) -> Result<Self, ConfigurationError> {
        if spacing == 0 {
            return Err(ConfigurationError::InvalidSpacing(spacing));
        }

        let max = MAX_CALIBRATED_ANGLE as u32;
        let marks: Vec<u32> = (0..=max).step_by(spacing as usize).collect();

        Ok(Self {
            marks,
            spacing,
            tolerance: spacing as f64 / 2.0,
        })
    }

    /// Target angles in ascending order.
    pub fn marks(&self) -> &[u32] {
        &self.marks
    }

    pub fn spacing(&self) -> u32 {
        self.spacing
    }

    /// Half the spacing: adjacent windows touch at their boundary.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// True when the last target lands exactly on 180°.
    pub fn covers_full_range(&self) -> bool {
        (MAX_CALIBRATED_ANGLE as u32) % self.spacing == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spacing_thirty() {
        let targets = TargetAngles::new(30).unwrap();
        assert_eq!(targets.marks(), &[0, 30, 60, 90, 120, 150, 180]);
        assert_eq!(targets.tolerance(), 15.0);
        assert!(targets.covers_full_range());
    }

    #[test]
    fn test_spacing_not_dividing_180() {
        let targets = TargetAngles::new(7).unwrap();
        assert_eq!(targets.marks().len(), 180 / 7 + 1);
        assert_eq!(targets.marks().last(), Some(&175));
        assert!(!targets.covers_full_range());
    }

    #[test]
    fn test_spacing_larger_than_range() {
        let targets = TargetAngles::new(200).unwrap();
        assert_eq!(targets.marks(), &[0]);
    }

    #[test]
    fn test_zero_spacing_rejected() {
        assert_eq!(
            TargetAngles::new(0),
            Err(ConfigurationError::InvalidSpacing(0))
        );
    }
}
