#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # featmatch
//!
//! Establishes correspondences between two sets of feature descriptors and
//! rejects ambiguous and geometrically inconsistent ones.
//!
//! ## Pipeline
//!
//! - **Search**: exhaustive brute-force matching, either mutually-nearest
//!   (cross-checked) single matches or the two nearest neighbors per query
//! - **Filter**: a multiple-of-minimum-distance filter for single matches, the
//!   nearest-neighbor ratio test for k-NN pairs
//! - **Outlier rejection**: fundamental matrix fit (7-point, 8-point, LMedS or
//!   RANSAC) keeping only correspondences consistent with the epipolar geometry
//!
//! ## Example
//!
//! ```rust
//! use featmatch::{BruteForceMatcher, MatcherParams, NormType};
//!
//! let params = MatcherParams {
//!     norm_type: NormType::Hamming.code(),
//!     use_knn: false,
//!     distance_threshold: 3,
//!     auto_remove_outliers: false,
//!     ..Default::default()
//! };
//! let matcher = BruteForceMatcher::from_params(&params)?;
//!
//! let d1 = vec![[0b1010_1010u8, 0xff], [0x0f, 0x00]];
//! let d2 = vec![[0x0f, 0x01], [0b1010_1011, 0xff]];
//! let k1 = vec![[0.0, 0.0], [1.0, 1.0]];
//! let k2 = vec![[0.0, 0.0], [1.0, 1.0]];
//!
//! let result = matcher.match_descriptors(&d1, &d2, &k1, &k2, None)?;
//! assert_eq!(result.matches.len(), 2);
//! assert_eq!(result.matches[0].train_idx, 1);
//! # Ok::<(), featmatch::MatcherError>(())
//! ```

/// Matcher configuration and validation.
pub mod config;

/// Descriptor norms.
pub mod descriptor;

mod error;
pub use error::MatcherError;

/// Raw match filters.
pub mod filter;

/// Fundamental matrix estimation.
pub mod geometry;

mod matcher;
pub use matcher::BruteForceMatcher;

/// Geometric outlier rejection.
pub mod outlier;

/// Nearest-neighbor search.
pub mod search;

/// Match and mask types.
pub mod types;

pub use config::{MatcherConfig, MatcherParams, MatchingStrategy};
pub use descriptor::{DescriptorElement, NormType};
pub use geometry::{FundamentalEstimator, FundamentalMethod, RobustParams};
pub use search::{BruteForceSearch, NearestNeighborSearch};
pub use types::{DMatch, KnnMatch, MatchMask, MatchResult, MatchStats};
