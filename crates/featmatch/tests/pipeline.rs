use std::collections::HashSet;

use featmatch::{
    BruteForceMatcher, FundamentalMethod, MatchMask, MatcherConfig, MatcherError, MatcherParams,
    NormType,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Two calibrated views of a random point cloud with descriptors attached to each point.
///
/// The second view lists its features in reverse order, and every
/// `outlier_every`-th point is moved to a random location in that view.
struct Scene {
    descriptors1: Vec<[f32; 8]>,
    descriptors2: Vec<[f32; 8]>,
    keypoints1: Vec<[f64; 2]>,
    keypoints2: Vec<[f64; 2]>,
    /// `train_of[i]` is the index in the second view of point `i`.
    train_of: Vec<usize>,
    outlier: Vec<bool>,
}

fn scene(n: usize, outlier_every: usize, seed: u64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let focal = 500.0;
    let (cx, cy) = (320.0, 240.0);
    let (s, c) = (0.1f64.sin(), 0.1f64.cos());
    let t = [0.6, -0.05, 0.05];

    let train_of: Vec<usize> = (0..n).rev().collect();

    let mut descriptors1 = Vec::with_capacity(n);
    let mut descriptors2 = vec![[0.0f32; 8]; n];
    let mut keypoints1 = Vec::with_capacity(n);
    let mut keypoints2 = vec![[0.0f64; 2]; n];
    let mut outlier = Vec::with_capacity(n);

    for i in 0..n {
        let p = [
            rng.random_range(-2.0..2.0),
            rng.random_range(-1.5..1.5),
            rng.random_range(5.0..10.0),
        ];
        let q = [c * p[0] - s * p[2] + t[0], p[1] + t[1], s * p[0] + c * p[2] + t[2]];

        let is_outlier = outlier_every > 0 && i % outlier_every == 0;
        let kp2 = if is_outlier {
            [rng.random_range(0.0..640.0), rng.random_range(0.0..480.0)]
        } else {
            [focal * q[0] / q[2] + cx, focal * q[1] / q[2] + cy]
        };

        let mut d = [0.0f32; 8];
        for v in d.iter_mut() {
            *v = rng.random_range(0.0..100.0);
        }
        let mut d2 = d;
        d2[0] += 0.5;

        descriptors1.push(d);
        keypoints1.push([focal * p[0] / p[2] + cx, focal * p[1] / p[2] + cy]);
        descriptors2[train_of[i]] = d2;
        keypoints2[train_of[i]] = kp2;
        outlier.push(is_outlier);
    }

    Scene {
        descriptors1,
        descriptors2,
        keypoints1,
        keypoints2,
        train_of,
        outlier,
    }
}

fn knn_params(auto_remove_outliers: bool) -> MatcherParams {
    MatcherParams {
        norm_type: NormType::L2.code(),
        use_knn: true,
        ratio_threshold: 0.8,
        auto_remove_outliers,
        fm_method: FundamentalMethod::Ransac.code(),
        ..Default::default()
    }
}

#[test]
fn test_knn_matches_are_unique_and_in_bounds() -> Result<(), MatcherError> {
    let mut rng = StdRng::seed_from_u64(3);
    let mut random_rows = |n: usize| -> Vec<[f32; 16]> {
        (0..n)
            .map(|_| {
                let mut row = [0.0f32; 16];
                for v in row.iter_mut() {
                    *v = rng.random_range(0.0..1.0);
                }
                row
            })
            .collect()
    };
    let d1 = random_rows(10);
    let d2 = random_rows(12);
    let k1 = vec![[0.0, 0.0]; 10];
    let k2 = vec![[0.0, 0.0]; 12];

    let matcher = BruteForceMatcher::from_params(&knn_params(false))?;
    let result = matcher.match_descriptors(&d1, &d2, &k1, &k2, None)?;

    assert!(result.matches.len() <= 10);
    assert_eq!(result.stats.num_raw_matches, 10);
    assert_eq!(result.stats.num_filtered_matches, result.matches.len());
    assert_eq!(result.stats.num_good_matches, None);

    let queries: HashSet<usize> = result.matches.iter().map(|m| m.query_idx).collect();
    assert_eq!(queries.len(), result.matches.len());
    for m in &result.matches {
        assert!(m.query_idx < 10);
        assert!(m.train_idx < 12);
        assert!(m.distance >= 0.0);
    }
    Ok(())
}

#[test]
fn test_full_pipeline_rejects_geometric_outliers() -> Result<(), MatcherError> {
    let scene = scene(100, 5, 11);
    let matcher = BruteForceMatcher::from_params(&knn_params(true))?;
    let result = matcher.match_descriptors(
        &scene.descriptors1,
        &scene.descriptors2,
        &scene.keypoints1,
        &scene.keypoints2,
        None,
    )?;

    // descriptors are distinctive, so every point survives the ratio test
    assert_eq!(result.stats.num_raw_matches, 100);
    assert_eq!(result.stats.num_filtered_matches, 100);
    assert_eq!(result.stats.num_good_matches, Some(result.matches.len()));

    let mut kept_inliers = 0;
    let mut kept_outliers = 0;
    for m in &result.matches {
        assert_eq!(m.train_idx, scene.train_of[m.query_idx]);
        if scene.outlier[m.query_idx] {
            kept_outliers += 1;
        } else {
            kept_inliers += 1;
        }
    }
    assert!(kept_inliers >= 76, "kept {kept_inliers} inliers");
    assert!(kept_outliers <= 3, "kept {kept_outliers} outliers");

    // order follows the query index
    assert!(result
        .matches
        .windows(2)
        .all(|w| w[0].query_idx < w[1].query_idx));
    Ok(())
}

#[test]
fn test_repeated_calls_are_identical() -> Result<(), MatcherError> {
    let scene = scene(60, 4, 5);
    for method in [FundamentalMethod::Ransac, FundamentalMethod::LMedS] {
        let params = MatcherParams {
            fm_method: method.code(),
            ..knn_params(true)
        };
        let matcher = BruteForceMatcher::from_params(&params)?;
        let run = || {
            matcher.match_descriptors(
                &scene.descriptors1,
                &scene.descriptors2,
                &scene.keypoints1,
                &scene.keypoints2,
                None,
            )
        };
        let a = run()?;
        let b = run()?;
        assert_eq!(a, b);
    }
    Ok(())
}

#[test]
fn test_cross_check_binary_descriptors_with_mask() -> Result<(), MatcherError> {
    let params = MatcherParams {
        norm_type: NormType::Hamming.code(),
        use_knn: false,
        distance_threshold: 2,
        auto_remove_outliers: false,
        ..Default::default()
    };
    let matcher = BruteForceMatcher::from_params(&params)?;

    let d1: Vec<[u8; 4]> = vec![
        [0x00, 0x00, 0x00, 0x01],
        [0xff, 0xff, 0x00, 0x00],
        [0x0f, 0x0f, 0x0f, 0x0f],
    ];
    let d2: Vec<[u8; 4]> = vec![
        [0x0f, 0x0f, 0x0f, 0x0e],
        [0x00, 0x00, 0x00, 0x00],
        [0xff, 0xff, 0x00, 0x03],
    ];
    let kp = vec![[0.0, 0.0]; 3];

    let result = matcher.match_descriptors(&d1, &d2, &kp, &kp, None)?;
    let pairs: Vec<(usize, usize)> = result
        .matches
        .iter()
        .map(|m| (m.query_idx, m.train_idx))
        .collect();
    assert_eq!(pairs, vec![(0, 1), (1, 2), (2, 0)]);

    // forbidding (1, 2) leaves query 1 without a mutual partner
    let mask = MatchMask::from_fn(3, 3, |i, j| !(i == 1 && j == 2));
    let result = matcher.match_descriptors(&d1, &d2, &kp, &kp, Some(&mask))?;
    assert!(result
        .matches
        .iter()
        .all(|m| (m.query_idx, m.train_idx) != (1, 2)));
    assert!(result.matches.iter().all(|m| m.query_idx != 1));

    let bad_mask = MatchMask::new(2, 3, true);
    assert!(matches!(
        matcher.match_descriptors(&d1, &d2, &kp, &kp, Some(&bad_mask)),
        Err(MatcherError::MaskShapeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_invalid_configurations_are_rejected() {
    let cases = [
        MatcherParams {
            norm_type: 3,
            ..Default::default()
        },
        MatcherParams {
            ratio_threshold: 1.5,
            ..Default::default()
        },
        MatcherParams {
            distance_threshold: -1,
            ..Default::default()
        },
        MatcherParams {
            fm_method: 3,
            ..Default::default()
        },
    ];
    for params in cases {
        assert!(matches!(
            MatcherConfig::try_from(&params),
            Err(MatcherError::InvalidConfiguration { .. })
        ));
    }
}

#[test]
fn test_float_descriptors_reject_hamming() -> Result<(), MatcherError> {
    let matcher = BruteForceMatcher::from_params(&MatcherParams {
        auto_remove_outliers: false,
        ..Default::default()
    })?;
    let d = vec![[0.0f32; 2]; 3];
    let kp = vec![[0.0, 0.0]; 3];
    assert!(matches!(
        matcher.match_descriptors(&d, &d, &kp, &kp, None),
        Err(MatcherError::IncompatibleNorm {
            norm: NormType::Hamming
        })
    ));
    Ok(())
}
