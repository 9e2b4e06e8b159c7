//! Configuration defects detected before any frame is processed.

use std::fmt;

/// A per-run setup problem that makes the angle mapping or detection meaningless.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A reference point was placed on the pivot, so its direction is undefined.
    ReferenceAtPivot { reference: &'static str },
    /// The 0° and 90° references point in the same direction.
    DegenerateSpan { angle0: f64, angle90: f64 },
    /// A region of interest has zero width or height.
    EmptyRegion { region: &'static str },
    /// Angle spacing must be a positive number of degrees.
    InvalidSpacing(u32),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceAtPivot { reference } => {
                write!(f, "{} reference point coincides with the pivot", reference)
            }
            Self::DegenerateSpan { angle0, angle90 } => write!(
                f,
                "0° reference ({:.2}°) and 90° reference ({:.2}°) have no angular separation",
                angle0, angle90
            ),
            Self::EmptyRegion { region } => write!(f, "{} has zero width or height", region),
            Self::InvalidSpacing(spacing) => {
                write!(f, "angle spacing must be positive, got {}", spacing)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}
