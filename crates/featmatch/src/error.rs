use crate::descriptor::NormType;

/// Errors returned by the matching pipeline.
#[derive(thiserror::Error, Debug)]
pub enum MatcherError {
    /// The matcher parameters failed validation.
    #[error("Invalid matcher configuration: {reason}")]
    InvalidConfiguration {
        /// Human readable description of the offending field.
        reason: String,
    },

    /// The matcher parameters could not be read or parsed.
    #[error("Failed to load matcher configuration: {0}")]
    ConfigLoad(String),

    /// There are no raw matches to filter.
    #[error("No raw matches available to filter")]
    EmptyMatchSet,

    /// Too few correspondences for the selected fundamental matrix method.
    #[error("Fundamental matrix estimation requires at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required by the method.
        required: usize,
        /// Actual number of correspondences provided.
        actual: usize,
    },

    /// The match mask does not have the shape of the descriptor sets.
    #[error("Mask shape {actual:?} does not match descriptor counts {expected:?}")]
    MaskShapeMismatch {
        /// Expected `(rows, cols)`, i.e. the number of query and train descriptors.
        expected: (usize, usize),
        /// Shape of the provided mask.
        actual: (usize, usize),
    },

    /// Keypoints are not aligned with their descriptors.
    #[error("Mismatched lengths: {descriptors} descriptors but {keypoints} keypoints")]
    KeypointCountMismatch {
        /// Number of descriptors.
        descriptors: usize,
        /// Number of keypoints.
        keypoints: usize,
    },

    /// A match references a keypoint that does not exist.
    #[error("Match index {index} out of bounds for {len} keypoints")]
    KeypointIndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Number of keypoints available.
        len: usize,
    },

    /// The norm cannot be evaluated on this descriptor element type.
    #[error("Norm {norm:?} is not supported for this descriptor type")]
    IncompatibleNorm {
        /// The configured norm.
        norm: NormType,
    },

    /// No valid fundamental matrix could be estimated from the correspondences.
    #[error("Fundamental matrix estimation failed on degenerate input")]
    GeometryEstimationFailed,
}
