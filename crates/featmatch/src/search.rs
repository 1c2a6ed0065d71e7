use crate::descriptor::{check_norm, distance, DescriptorElement, NormType};
use crate::error::MatcherError;
use crate::types::{DMatch, KnnMatch, MatchMask};

/// Nearest-neighbor search between two descriptor sets.
pub trait NearestNeighborSearch {
    /// Mutually-nearest matches.
    ///
    /// For every query, finds the closest permitted train descriptor and keeps
    /// the pair only if the query is also the closest permitted query of that
    /// train descriptor.
    fn match_cross_check<T: DescriptorElement, const N: usize>(
        &self,
        query: &[[T; N]],
        train: &[[T; N]],
        norm: NormType,
        mask: Option<&MatchMask>,
    ) -> Result<Vec<DMatch>, MatcherError>;

    /// Two nearest permitted train descriptors for every query.
    ///
    /// Queries with fewer than two permitted candidates produce no entry.
    fn knn_match<T: DescriptorElement, const N: usize>(
        &self,
        query: &[[T; N]],
        train: &[[T; N]],
        norm: NormType,
        mask: Option<&MatchMask>,
    ) -> Result<Vec<KnnMatch>, MatcherError>;
}

/// Exhaustive search comparing every query against every train descriptor.
///
/// Results are deterministic: ties are broken by the lowest index.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForceSearch;

impl NearestNeighborSearch for BruteForceSearch {
    fn match_cross_check<T: DescriptorElement, const N: usize>(
        &self,
        query: &[[T; N]],
        train: &[[T; N]],
        norm: NormType,
        mask: Option<&MatchMask>,
    ) -> Result<Vec<DMatch>, MatcherError> {
        let distances = distance_table(query, train, norm, mask)?;
        let (m, n) = (query.len(), train.len());

        // Forward pass: for each query, the best permitted train.
        let mut fwd: Vec<Option<(usize, f32)>> = vec![None; m];
        // Reverse pass: for each train, the best permitted query.
        let mut rev: Vec<Option<(usize, f32)>> = vec![None; n];

        for i in 0..m {
            for j in 0..n {
                let Some(d) = distances[i * n + j] else {
                    continue;
                };
                if fwd[i].map_or(true, |(_, best)| d < best) {
                    fwd[i] = Some((j, d));
                }
                if rev[j].map_or(true, |(_, best)| d < best) {
                    rev[j] = Some((i, d));
                }
            }
        }

        let matches = fwd
            .iter()
            .enumerate()
            .filter_map(|(i, best)| {
                let (j, d) = (*best)?;
                match rev[j] {
                    Some((back, _)) if back == i => Some(DMatch::new(i, j, d)),
                    _ => None,
                }
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Cross-checked search: {} queries x {} train -> {} matches",
            m,
            n,
            matches.len()
        );
        Ok(matches)
    }

    fn knn_match<T: DescriptorElement, const N: usize>(
        &self,
        query: &[[T; N]],
        train: &[[T; N]],
        norm: NormType,
        mask: Option<&MatchMask>,
    ) -> Result<Vec<KnnMatch>, MatcherError> {
        check_norm::<T>(norm)?;
        if let Some(mask) = mask {
            mask.check_shape(query.len(), train.len())?;
        }

        let mut pairs = Vec::with_capacity(query.len());
        for (i, d1) in query.iter().enumerate() {
            let mut best: Option<(usize, f32)> = None;
            let mut second: Option<(usize, f32)> = None;

            for (j, d2) in train.iter().enumerate() {
                if mask.is_some_and(|mask| !mask.allowed(i, j)) {
                    continue;
                }
                let d = distance(norm, d1, d2);
                if d.is_nan() {
                    continue;
                }
                if best.map_or(true, |(_, b)| d < b) {
                    second = best;
                    best = Some((j, d));
                } else if second.map_or(true, |(_, s)| d < s) {
                    second = Some((j, d));
                }
            }

            if let (Some((bj, bd)), Some((sj, sd))) = (best, second) {
                pairs.push(KnnMatch {
                    best: DMatch::new(i, bj, bd),
                    second: DMatch::new(i, sj, sd),
                });
            }
        }

        log::debug!(
            "2-NN search: {} queries x {} train -> {} pairs",
            query.len(),
            train.len(),
            pairs.len()
        );
        Ok(pairs)
    }
}

/// Row-major `query x train` table of distances, `None` where the mask forbids the pair.
fn distance_table<T: DescriptorElement, const N: usize>(
    query: &[[T; N]],
    train: &[[T; N]],
    norm: NormType,
    mask: Option<&MatchMask>,
) -> Result<Vec<Option<f32>>, MatcherError> {
    check_norm::<T>(norm)?;
    if let Some(mask) = mask {
        mask.check_shape(query.len(), train.len())?;
    }

    let mut table = Vec::with_capacity(query.len() * train.len());
    for (i, d1) in query.iter().enumerate() {
        for (j, d2) in train.iter().enumerate() {
            let permitted = mask.map_or(true, |mask| mask.allowed(i, j));
            let d = distance(norm, d1, d2);
            table.push((permitted && !d.is_nan()).then_some(d));
        }
    }
    Ok(table)
}
