//! # Two-view geometry
//!
//! Fundamental matrix estimation used to reject matches that violate the
//! epipolar constraint.
//!
//! - [`fundamental`]: linear 7-point and 8-point solvers, epipolar error
//! - [`robust`]: RANSAC and LMedS estimators over 7-point samples

mod fundamental;
pub use fundamental::*;

mod robust;
pub use robust::*;

/// Method used to estimate the fundamental matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FundamentalMethod {
    /// Minimal 7-point solver. Assumes outlier-free input.
    SevenPoint,
    /// Normalized 8-point least-squares solver. Assumes outlier-free input.
    EightPoint,
    /// Least median of squares.
    LMedS,
    /// Random sample consensus.
    Ransac,
}

impl FundamentalMethod {
    /// Map a method code (1, 2, 4 or 8) to a [`FundamentalMethod`].
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::SevenPoint),
            2 => Some(Self::EightPoint),
            4 => Some(Self::LMedS),
            8 => Some(Self::Ransac),
            _ => None,
        }
    }

    /// The integer code of this method.
    pub fn code(self) -> i32 {
        match self {
            Self::SevenPoint => 1,
            Self::EightPoint => 2,
            Self::LMedS => 4,
            Self::Ransac => 8,
        }
    }

    /// Minimum number of correspondences the method accepts.
    pub fn min_points(self) -> usize {
        match self {
            Self::SevenPoint => 7,
            Self::EightPoint | Self::LMedS | Self::Ransac => 8,
        }
    }
}
