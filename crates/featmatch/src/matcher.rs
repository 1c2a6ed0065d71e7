use crate::config::{MatcherConfig, MatcherParams, MatchingStrategy};
use crate::descriptor::DescriptorElement;
use crate::error::MatcherError;
use crate::filter::{filter_by_min_distance, filter_by_ratio};
use crate::geometry::{FundamentalEstimator, RobustFundamentalEstimator};
use crate::outlier::remove_outliers;
use crate::search::{BruteForceSearch, NearestNeighborSearch};
use crate::types::{MatchMask, MatchResult, MatchStats};

/// Brute-force descriptor matcher with statistical and geometric filtering.
///
/// A call runs three stages in order:
///
/// 1. raw search, cross-checked single matches or two nearest neighbors
///    depending on the configured [`MatchingStrategy`];
/// 2. the minimum-distance filter or the ratio test, paired with the search mode;
/// 3. optionally, fundamental matrix outlier rejection.
///
/// The matcher holds no per-call state, so a shared instance can serve
/// concurrent calls.
///
/// # Example
///
/// ```rust
/// use featmatch::{BruteForceMatcher, MatcherParams};
///
/// let params = MatcherParams {
///     norm_type: 4, // L2
///     use_knn: true,
///     ratio_threshold: 0.8,
///     auto_remove_outliers: false,
///     ..Default::default()
/// };
/// let matcher = BruteForceMatcher::from_params(&params)?;
///
/// let d1 = vec![[0.0f32, 0.0], [5.0, 5.0]];
/// let d2 = vec![[0.1f32, 0.0], [5.0, 5.2], [9.0, 9.0]];
/// let k1 = vec![[10.0, 10.0], [20.0, 20.0]];
/// let k2 = vec![[11.0, 10.0], [21.0, 20.0], [30.0, 30.0]];
///
/// let result = matcher.match_descriptors(&d1, &d2, &k1, &k2, None)?;
/// assert_eq!(result.matches.len(), 2);
/// assert_eq!(result.stats.num_raw_matches, 2);
/// # Ok::<(), featmatch::MatcherError>(())
/// ```
#[derive(Clone, Debug)]
pub struct BruteForceMatcher<S = BruteForceSearch, E = RobustFundamentalEstimator> {
    config: MatcherConfig,
    search: S,
    estimator: E,
}

impl BruteForceMatcher {
    /// Create a matcher with the built-in search and estimator.
    pub fn new(config: MatcherConfig) -> Self {
        Self::with_backends(config, BruteForceSearch, RobustFundamentalEstimator)
    }

    /// Validate `params` and create a matcher.
    pub fn from_params(params: &MatcherParams) -> Result<Self, MatcherError> {
        Ok(Self::new(MatcherConfig::new(params)?))
    }
}

impl<S: NearestNeighborSearch, E: FundamentalEstimator> BruteForceMatcher<S, E> {
    /// Create a matcher with custom search and geometry backends.
    pub fn with_backends(config: MatcherConfig, search: S, estimator: E) -> Self {
        Self {
            config,
            search,
            estimator,
        }
    }

    /// The validated configuration.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match `descriptors1` (query) against `descriptors2` (train).
    ///
    /// Keypoints must be aligned with their descriptors. `mask`, if given,
    /// must be `descriptors1.len() x descriptors2.len()` and restricts which
    /// pairs may be matched.
    pub fn match_descriptors<T: DescriptorElement, const N: usize>(
        &self,
        descriptors1: &[[T; N]],
        descriptors2: &[[T; N]],
        keypoints1: &[[f64; 2]],
        keypoints2: &[[f64; 2]],
        mask: Option<&MatchMask>,
    ) -> Result<MatchResult, MatcherError> {
        check_aligned(descriptors1.len(), keypoints1.len())?;
        check_aligned(descriptors2.len(), keypoints2.len())?;

        let norm = self.config.norm();
        let (num_raw_matches, filtered) = match self.config.strategy() {
            MatchingStrategy::CrossCheck { distance_threshold } => {
                let raw = self
                    .search
                    .match_cross_check(descriptors1, descriptors2, norm, mask)?;
                (raw.len(), filter_by_min_distance(&raw, distance_threshold)?)
            }
            MatchingStrategy::Knn { ratio_threshold } => {
                let raw = self.search.knn_match(descriptors1, descriptors2, norm, mask)?;
                (raw.len(), filter_by_ratio(&raw, ratio_threshold))
            }
        };

        let mut stats = MatchStats {
            num_raw_matches,
            num_filtered_matches: filtered.len(),
            num_good_matches: None,
        };

        let matches = if self.config.auto_remove_outliers() {
            let good = remove_outliers(
                &filtered,
                keypoints1,
                keypoints2,
                self.config.method(),
                self.config.robust(),
                &self.estimator,
            )?;
            stats.num_good_matches = Some(good.len());
            good
        } else {
            filtered
        };

        log::debug!(
            "Matched descriptors: raw={} filtered={} good={:?}",
            stats.num_raw_matches,
            stats.num_filtered_matches,
            stats.num_good_matches
        );

        Ok(MatchResult { matches, stats })
    }
}

fn check_aligned(descriptors: usize, keypoints: usize) -> Result<(), MatcherError> {
    if descriptors != keypoints {
        return Err(MatcherError::KeypointCountMismatch {
            descriptors,
            keypoints,
        });
    }
    Ok(())
}
