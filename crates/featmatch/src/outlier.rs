use crate::error::MatcherError;
use crate::geometry::{FundamentalEstimator, FundamentalMethod, RobustParams};
use crate::types::DMatch;

/// Discard matches that are inconsistent with a fundamental matrix fitted to all of them.
///
/// Each match is turned into the point pair `(keypoints1[query], keypoints2[train])`
/// and handed to `estimator`. The matches whose inlier flag is set are returned
/// in their original order.
///
/// Fails with [`MatcherError::InsufficientCorrespondences`] when there are
/// fewer matches than `method` needs, before the estimator is invoked.
pub fn remove_outliers<E: FundamentalEstimator + ?Sized>(
    matches: &[DMatch],
    keypoints1: &[[f64; 2]],
    keypoints2: &[[f64; 2]],
    method: FundamentalMethod,
    params: &RobustParams,
    estimator: &E,
) -> Result<Vec<DMatch>, MatcherError> {
    let mut x1 = Vec::with_capacity(matches.len());
    let mut x2 = Vec::with_capacity(matches.len());
    for m in matches {
        x1.push(keypoint(keypoints1, m.query_idx)?);
        x2.push(keypoint(keypoints2, m.train_idx)?);
    }

    let required = method.min_points();
    if matches.len() < required {
        return Err(MatcherError::InsufficientCorrespondences {
            required,
            actual: matches.len(),
        });
    }

    let fit = estimator.estimate(&x1, &x2, method, params)?;
    if fit.inliers.len() != matches.len() {
        return Err(MatcherError::GeometryEstimationFailed);
    }

    Ok(matches
        .iter()
        .zip(fit.inliers.iter())
        .filter_map(|(m, &inlier)| inlier.then_some(*m))
        .collect())
}

fn keypoint(keypoints: &[[f64; 2]], index: usize) -> Result<[f64; 2], MatcherError> {
    keypoints
        .get(index)
        .copied()
        .ok_or(MatcherError::KeypointIndexOutOfBounds {
            index,
            len: keypoints.len(),
        })
}
