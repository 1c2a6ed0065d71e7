use crate::error::MatcherError;
use crate::types::{DMatch, KnnMatch};

/// Keep matches whose distance is at most `distance_threshold` times the smallest distance.
///
/// Fails with [`MatcherError::EmptyMatchSet`] when `matches` is empty, since
/// there is no minimum to compare against. Input order is preserved.
pub fn filter_by_min_distance(
    matches: &[DMatch],
    distance_threshold: u32,
) -> Result<Vec<DMatch>, MatcherError> {
    let min_distance = matches
        .iter()
        .map(|m| m.distance)
        .min_by(|a, b| a.total_cmp(b))
        .ok_or(MatcherError::EmptyMatchSet)?;

    let max_distance = distance_threshold as f32 * min_distance;
    Ok(matches
        .iter()
        .filter(|m| m.distance <= max_distance)
        .copied()
        .collect())
}

/// Nearest-neighbor ratio test.
///
/// Keeps the best match of each pair when `best / second <= ratio_threshold`.
/// A pair whose runner-up has zero distance is ambiguous and always rejected.
/// Input order is preserved.
pub fn filter_by_ratio(pairs: &[KnnMatch], ratio_threshold: f64) -> Vec<DMatch> {
    pairs
        .iter()
        .filter(|pair| {
            let second = pair.second.distance as f64;
            if second <= 0.0 {
                return false;
            }
            pair.best.distance as f64 / second <= ratio_threshold
        })
        .map(|pair| pair.best)
        .collect()
}
