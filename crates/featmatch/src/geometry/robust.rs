use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::fundamental::{epipolar_distance_sq, fundamental_7point, fundamental_8point};
use super::FundamentalMethod;
use crate::error::MatcherError;

/// Parameters for the robust fundamental matrix estimators.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustParams {
    /// Desired probability that at least one sample is outlier-free (RANSAC, LMedS).
    pub confidence: f64,
    /// Maximum distance from a point to its epipolar line to count as an inlier (RANSAC).
    pub threshold: f64,
    /// Upper bound on the number of sampled hypotheses.
    pub max_iterations: usize,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for RobustParams {
    fn default() -> Self {
        Self {
            confidence: 0.99,
            threshold: 3.0,
            max_iterations: 1000,
            random_seed: Some(0),
        }
    }
}

/// Result of a fundamental matrix fit.
#[derive(Clone, Debug, PartialEq)]
pub struct FundamentalFit {
    /// Estimated fundamental matrix, row-major.
    pub matrix: [[f64; 3]; 3],
    /// Per-correspondence inlier mask, aligned with the input.
    pub inliers: Vec<bool>,
    /// Number of `true` entries in `inliers`.
    pub num_inliers: usize,
}

/// Fit a fundamental matrix to 2D correspondences and classify them.
pub trait FundamentalEstimator {
    /// Estimate the fundamental matrix relating `x1` and `x2` with `method`.
    ///
    /// The returned inlier mask has the same length as the input.
    fn estimate(
        &self,
        x1: &[[f64; 2]],
        x2: &[[f64; 2]],
        method: FundamentalMethod,
        params: &RobustParams,
    ) -> Result<FundamentalFit, MatcherError>;
}

/// Default estimator: linear solvers for 7/8-point, sampled hypotheses for RANSAC and LMedS.
#[derive(Clone, Copy, Debug, Default)]
pub struct RobustFundamentalEstimator;

impl FundamentalEstimator for RobustFundamentalEstimator {
    fn estimate(
        &self,
        x1: &[[f64; 2]],
        x2: &[[f64; 2]],
        method: FundamentalMethod,
        params: &RobustParams,
    ) -> Result<FundamentalFit, MatcherError> {
        find_fundamental(x1, x2, method, params)
    }
}

/// Estimate a fundamental matrix with the given method.
///
/// The 7-point and 8-point methods trust every correspondence and return an
/// all-inlier mask. RANSAC and LMedS sample minimal 7-point sets and classify
/// each correspondence against the best hypothesis.
pub fn find_fundamental(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    method: FundamentalMethod,
    params: &RobustParams,
) -> Result<FundamentalFit, MatcherError> {
    let required = method.min_points();
    if x1.len() != x2.len() || x1.len() < required {
        return Err(MatcherError::InsufficientCorrespondences {
            required,
            actual: x1.len().min(x2.len()),
        });
    }

    match method {
        FundamentalMethod::SevenPoint => {
            let candidates = fundamental_7point(x1, x2)?;
            let matrix = candidates
                .into_iter()
                .map(|f| (total_error(&f, x1, x2), f))
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, f)| f)
                .ok_or(MatcherError::GeometryEstimationFailed)?;
            Ok(all_inliers(matrix, x1.len()))
        }
        FundamentalMethod::EightPoint => {
            let matrix = fundamental_8point(x1, x2)?;
            Ok(all_inliers(matrix, x1.len()))
        }
        FundamentalMethod::Ransac => ransac_fundamental(x1, x2, params),
        FundamentalMethod::LMedS => lmeds_fundamental(x1, x2, params),
    }
}

/// Estimate a fundamental matrix with RANSAC over 7-point samples.
///
/// A correspondence is an inlier when its squared epipolar distance is at most
/// `threshold^2`. The iteration budget shrinks as the best inlier ratio grows.
pub fn ransac_fundamental(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    params: &RobustParams,
) -> Result<FundamentalFit, MatcherError> {
    let n = check_robust_input(x1, x2)?;
    let mut rng = make_rng(params);
    let threshold_sq = params.threshold * params.threshold;

    let mut best_model = None;
    let mut best_inliers = Vec::new();
    let mut best_count = 0usize;
    let mut best_score = f64::INFINITY;

    let mut max_iters = params.max_iterations;
    let mut iter = 0usize;
    while iter < max_iters {
        iter += 1;

        let (s1, s2) = draw_sample(&mut rng, x1, x2);
        let Ok(candidates) = fundamental_7point(&s1, &s2) else {
            continue;
        };

        for f in candidates {
            let mut inliers = vec![false; n];
            let mut count = 0usize;
            let mut score = 0.0f64;
            for i in 0..n {
                let d = epipolar_distance_sq(&f, &x1[i], &x2[i]);
                if d <= threshold_sq {
                    inliers[i] = true;
                    count += 1;
                    score += d;
                }
            }

            if count > best_count || (count == best_count && score < best_score) {
                if count > best_count {
                    let outlier_ratio = (n - count) as f64 / n as f64;
                    max_iters = update_num_iters(
                        params.confidence,
                        outlier_ratio,
                        FundamentalMethod::SevenPoint.min_points(),
                        max_iters,
                    );
                }
                best_model = Some(f);
                best_inliers = inliers;
                best_count = count;
                best_score = score;
            }
        }
    }

    log::debug!(
        "RANSAC fundamental: {} iterations, {}/{} inliers",
        iter,
        best_count,
        n
    );

    let matrix = match best_model {
        Some(m) if best_count > 0 => m,
        _ => return Err(MatcherError::GeometryEstimationFailed),
    };

    Ok(FundamentalFit {
        matrix,
        inliers: best_inliers,
        num_inliers: best_count,
    })
}

/// Estimate a fundamental matrix by least median of squares over 7-point samples.
///
/// The hypothesis with the smallest median squared epipolar error wins. Inliers
/// are then selected with a threshold derived from the robust standard
/// deviation estimate of that median.
pub fn lmeds_fundamental(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
    params: &RobustParams,
) -> Result<FundamentalFit, MatcherError> {
    let n = check_robust_input(x1, x2)?;
    let model_points = FundamentalMethod::SevenPoint.min_points();
    let mut rng = make_rng(params);

    // up to 45% outliers
    let iterations = update_num_iters(params.confidence, 0.45, model_points, params.max_iterations);

    let mut best_model = None;
    let mut best_median = f64::INFINITY;
    let mut errors = vec![0.0f64; n];
    let mut scratch = vec![0.0f64; n];

    for _ in 0..iterations {
        let (s1, s2) = draw_sample(&mut rng, x1, x2);
        let Ok(candidates) = fundamental_7point(&s1, &s2) else {
            continue;
        };

        for f in candidates {
            for i in 0..n {
                scratch[i] = epipolar_distance_sq(&f, &x1[i], &x2[i]);
            }
            let median = median_in_place(&mut scratch);
            if median < best_median {
                best_median = median;
                best_model = Some(f);
            }
        }
    }

    let matrix = match best_model {
        Some(m) if best_median.is_finite() => m,
        _ => return Err(MatcherError::GeometryEstimationFailed),
    };

    let sigma = 2.5 * 1.4826 * (1.0 + 5.0 / (n - model_points) as f64) * best_median.sqrt();
    let sigma = sigma.max(0.001);
    let threshold_sq = sigma * sigma;

    for (i, e) in errors.iter_mut().enumerate() {
        *e = epipolar_distance_sq(&matrix, &x1[i], &x2[i]);
    }
    let inliers: Vec<bool> = errors.iter().map(|&e| e <= threshold_sq).collect();
    let num_inliers = inliers.iter().filter(|&&b| b).count();

    log::debug!(
        "LMedS fundamental: {} iterations, median error {:.4}, {}/{} inliers",
        iterations,
        best_median,
        num_inliers,
        n
    );

    Ok(FundamentalFit {
        matrix,
        inliers,
        num_inliers,
    })
}

/// Number of iterations needed to draw an outlier-free sample with probability
/// `confidence`, given the outlier ratio and sample size. Never exceeds `max_iters`.
pub fn update_num_iters(
    confidence: f64,
    outlier_ratio: f64,
    model_points: usize,
    max_iters: usize,
) -> usize {
    let p = confidence.clamp(0.0, 1.0);
    let ep = outlier_ratio.clamp(0.0, 1.0);

    let num = (1.0 - p).max(f64::MIN_POSITIVE);
    let denom = 1.0 - (1.0 - ep).powi(model_points as i32);
    if denom < f64::MIN_POSITIVE {
        return 0;
    }

    let num = num.ln();
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max_iters as f64 * -denom {
        max_iters
    } else {
        (num / denom).round() as usize
    }
}

fn check_robust_input(x1: &[[f64; 2]], x2: &[[f64; 2]]) -> Result<usize, MatcherError> {
    let required = FundamentalMethod::Ransac.min_points();
    if x1.len() != x2.len() || x1.len() < required {
        return Err(MatcherError::InsufficientCorrespondences {
            required,
            actual: x1.len().min(x2.len()),
        });
    }
    Ok(x1.len())
}

fn make_rng(params: &RobustParams) -> StdRng {
    match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut tr = rand::rng();
            StdRng::from_rng(&mut tr)
        }
    }
}

fn draw_sample(
    rng: &mut StdRng,
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    let k = FundamentalMethod::SevenPoint.min_points();
    let sample = rand::seq::index::sample(rng, x1.len(), k);
    let mut s1 = Vec::with_capacity(k);
    let mut s2 = Vec::with_capacity(k);
    for idx in sample.iter() {
        s1.push(x1[idx]);
        s2.push(x2[idx]);
    }
    (s1, s2)
}

fn median_in_place(values: &mut [f64]) -> f64 {
    let mid = values.len() / 2;
    let (_, median, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *median
}

fn total_error(f: &[[f64; 3]; 3], x1: &[[f64; 2]], x2: &[[f64; 2]]) -> f64 {
    x1.iter()
        .zip(x2.iter())
        .map(|(p, q)| epipolar_distance_sq(f, p, q))
        .sum()
}

fn all_inliers(matrix: [[f64; 3]; 3], n: usize) -> FundamentalFit {
    FundamentalFit {
        matrix,
        inliers: vec![true; n],
        num_inliers: n,
    }
}
