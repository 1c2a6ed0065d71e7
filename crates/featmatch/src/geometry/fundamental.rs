//! Linear fundamental matrix solvers and the epipolar error used to score them.
//!
//! Matrices are row-major `[[f64; 3]; 3]` and satisfy `x2^T F x1 = 0` for
//! homogeneous points `x1` in the first view and `x2` in the second.

use crate::error::MatcherError;

/// Estimate the fundamental matrix using the normalized 8-point algorithm.
///
/// - `x1`: points in image 1 (length >= 8)
/// - `x2`: corresponding points in image 2 (same length)
///
/// The least-squares solution is projected onto the rank-2 matrices.
pub fn fundamental_8point(x1: &[[f64; 2]], x2: &[[f64; 2]]) -> Result<[[f64; 3]; 3], MatcherError> {
    check_input(x1, x2, 8)?;

    // Normalize points with similarity transforms T1, T2 to have zero mean and avg sqrt(2) distance
    let (x1n, t1) = normalize_points_2d(x1);
    let (x2n, t2) = normalize_points_2d(x2);

    // Accumulate A^T A (9 x 9) for x2' * F * x1 = 0 instead of the full N x 9 system.
    let mut ata = faer::Mat::<f64>::zeros(9, 9);
    for (p, q) in x1n.iter().zip(x2n.iter()) {
        let row = epipolar_row(p, q);
        for r in 0..9 {
            for c in r..9 {
                let v = ata.read(r, c) + row[r] * row[c];
                ata.write(r, c, v);
            }
        }
    }
    for r in 0..9 {
        for c in 0..r {
            let v = ata.read(c, r);
            ata.write(r, c, v);
        }
    }

    // Solve Af = 0: the right singular vector of the smallest singular value
    let svd = ata.svd();
    let v = svd.v();
    let mut fvec = [0.0; 9];
    for (k, f) in fvec.iter_mut().enumerate() {
        *f = v.read(k, 8);
    }

    let f = enforce_rank2(&vec9_to_mat3(&fvec));
    let f = denormalize(&f, &t1, &t2);
    finalize(&f).ok_or(MatcherError::GeometryEstimationFailed)
}

/// Estimate up to three fundamental matrices from exactly seven correspondences.
///
/// The two-dimensional null space of the 7 x 9 epipolar system is spanned by
/// `F1` and `F2`; the solutions are the real roots of `det(l * F1 + (1 - l) * F2) = 0`.
/// Extra correspondences beyond the first seven are ignored.
pub fn fundamental_7point(
    x1: &[[f64; 2]],
    x2: &[[f64; 2]],
) -> Result<Vec<[[f64; 3]; 3]>, MatcherError> {
    check_input(x1, x2, 7)?;

    let (x1n, t1) = normalize_points_2d(&x1[..7]);
    let (x2n, t2) = normalize_points_2d(&x2[..7]);

    let mut a = faer::Mat::<f64>::zeros(7, 9);
    for (i, (p, q)) in x1n.iter().zip(x2n.iter()).enumerate() {
        let row = epipolar_row(p, q);
        for (c, &value) in row.iter().enumerate() {
            a.write(i, c, value);
        }
    }

    // Last two right singular vectors span the null space
    let svd = a.svd();
    let v = svd.v();
    let mut f1 = [0.0; 9];
    let mut f2 = [0.0; 9];
    for k in 0..9 {
        f1[k] = v.read(k, 7);
        f2[k] = v.read(k, 8);
    }
    let f1 = vec9_to_mat3(&f1);
    let f2 = vec9_to_mat3(&f2);

    // det(l * F1 + (1 - l) * F2) is a cubic in l; recover its coefficients from
    // four samples of the determinant.
    let blend = |l: f64| -> [[f64; 3]; 3] {
        let mut m = [[0.0; 3]; 3];
        for r in 0..3 {
            for c in 0..3 {
                m[r][c] = l * f1[r][c] + (1.0 - l) * f2[r][c];
            }
        }
        m
    };
    let d0 = det3(&blend(0.0));
    let d1 = det3(&blend(1.0));
    let dm1 = det3(&blend(-1.0));
    let d2 = det3(&blend(2.0));

    let c0 = d0;
    let c2 = 0.5 * (d1 + dm1) - c0;
    let odd = 0.5 * (d1 - dm1);
    let c3 = (d2 - c0 - 4.0 * c2 - 2.0 * odd) / 6.0;
    let c1 = odd - c3;

    let mut models = Vec::with_capacity(3);
    for l in solve_cubic(c3, c2, c1, c0) {
        let f = denormalize(&blend(l), &t1, &t2);
        if let Some(f) = finalize(&f) {
            models.push(f);
        }
    }

    if models.is_empty() {
        return Err(MatcherError::GeometryEstimationFailed);
    }
    Ok(models)
}

/// Squared distance of a correspondence to its epipolar lines.
///
/// Returns the larger of the squared distance from `x2` to the line `F x1` and
/// from `x1` to the line `F^T x2`, in the units of the point coordinates.
pub fn epipolar_distance_sq(f: &[[f64; 3]; 3], x1: &[f64; 2], x2: &[f64; 2]) -> f64 {
    let (u1, v1) = (x1[0], x1[1]);
    let (u2, v2) = (x2[0], x2[1]);

    // l2 = F * x1
    let a2 = f[0][0] * u1 + f[0][1] * v1 + f[0][2];
    let b2 = f[1][0] * u1 + f[1][1] * v1 + f[1][2];
    let c2 = f[2][0] * u1 + f[2][1] * v1 + f[2][2];

    // l1 = F^T * x2
    let a1 = f[0][0] * u2 + f[1][0] * v2 + f[2][0];
    let b1 = f[0][1] * u2 + f[1][1] * v2 + f[2][1];
    let c1 = f[0][2] * u2 + f[1][2] * v2 + f[2][2];

    let s2 = 1.0 / (a2 * a2 + b2 * b2);
    let s1 = 1.0 / (a1 * a1 + b1 * b1);
    let d2 = a2 * u2 + b2 * v2 + c2;
    let d1 = a1 * u1 + b1 * v1 + c1;

    let err = (d1 * d1 * s1).max(d2 * d2 * s2);
    if err.is_nan() {
        f64::INFINITY
    } else {
        err
    }
}

fn check_input(x1: &[[f64; 2]], x2: &[[f64; 2]], required: usize) -> Result<(), MatcherError> {
    let actual = x1.len().min(x2.len());
    if x1.len() != x2.len() || actual < required {
        return Err(MatcherError::InsufficientCorrespondences { required, actual });
    }
    let finite = |p: &[f64; 2]| p[0].is_finite() && p[1].is_finite();
    if !x1.iter().all(finite) || !x2.iter().all(finite) {
        return Err(MatcherError::GeometryEstimationFailed);
    }
    Ok(())
}

#[inline]
fn epipolar_row(p: &[f64; 2], q: &[f64; 2]) -> [f64; 9] {
    let (x, y) = (p[0], p[1]);
    let (xp, yp) = (q[0], q[1]);
    [xp * x, xp * y, xp, yp * x, yp * y, yp, x, y, 1.0]
}

fn normalize_points_2d(x: &[[f64; 2]]) -> (Vec<[f64; 2]>, [[f64; 3]; 3]) {
    let n = x.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in x {
        mx += p[0];
        my += p[1];
    }
    mx /= n;
    my /= n;
    let mut mean_dist = 0.0;
    for p in x {
        let dx = p[0] - mx;
        let dy = p[1] - my;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= n;
    let scale = if mean_dist > 0.0 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let xn = x
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale])
        .collect();

    // Similarity transform matrix T = [[s,0,-s*mx],[0,s,-s*my],[0,0,1]]
    let t = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];
    (xn, t)
}

fn vec9_to_mat3(v: &[f64; 9]) -> [[f64; 3]; 3] {
    [[v[0], v[1], v[2]], [v[3], v[4], v[5]], [v[6], v[7], v[8]]]
}

/// Zero the smallest singular value of `f`.
fn enforce_rank2(f: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut m = faer::Mat::<f64>::zeros(3, 3);
    for r in 0..3 {
        for c in 0..3 {
            m.write(r, c, f[r][c]);
        }
    }
    let svd = m.svd();
    let (u, s, v) = (svd.u(), svd.s_diagonal(), svd.v());
    let sigma = [s.read(0), s.read(1)];

    let mut out = [[0.0; 3]; 3];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = sigma[0] * u.read(r, 0) * v.read(c, 0) + sigma[1] * u.read(r, 1) * v.read(c, 1);
        }
    }
    out
}

/// Undo the point normalization: `F = T2^T * F * T1`.
fn denormalize(f: &[[f64; 3]; 3], t1: &[[f64; 3]; 3], t2: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let ft1 = mat3_mul(f, t1);
    mat3_mul(&transpose3(t2), &ft1)
}

/// Fix the projective scale of `f`, rejecting non-finite or null matrices.
fn finalize(f: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let norm = f.iter().flatten().map(|v| v * v).sum::<f64>().sqrt();
    if !norm.is_finite() || norm < f64::EPSILON {
        return None;
    }
    let scale = if f[2][2].abs() > f64::EPSILON * norm {
        1.0 / f[2][2]
    } else {
        1.0 / norm
    };
    let mut out = *f;
    out.iter_mut().flatten().for_each(|v| *v *= scale);
    Some(out)
}

fn mat3_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn transpose3(a: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[j][i] = a[i][j];
        }
    }
    out
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1]) - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Real roots of `c3 x^3 + c2 x^2 + c1 x + c0`.
///
/// Falls back to the quadratic or linear equation when the leading
/// coefficients vanish. Each root gets one Newton refinement step.
fn solve_cubic(c3: f64, c2: f64, c1: f64, c0: f64) -> Vec<f64> {
    let scale = c3.abs().max(c2.abs()).max(c1.abs()).max(c0.abs());
    if scale == 0.0 || !scale.is_finite() {
        return Vec::new();
    }
    let eps = 1e-12 * scale;

    if c3.abs() <= eps {
        if c2.abs() <= eps {
            if c1.abs() <= eps {
                return Vec::new();
            }
            return vec![-c0 / c1];
        }
        let disc = c1 * c1 - 4.0 * c2 * c0;
        if disc < 0.0 {
            return Vec::new();
        }
        let sq = disc.sqrt();
        return vec![(-c1 + sq) / (2.0 * c2), (-c1 - sq) / (2.0 * c2)];
    }

    // monic x^3 + p2 x^2 + p1 x + p0, depressed with x = t - p2 / 3
    let (p2, p1, p0) = (c2 / c3, c1 / c3, c0 / c3);
    let shift = p2 / 3.0;
    let a = p1 - p2 * p2 / 3.0;
    let b = 2.0 * p2 * p2 * p2 / 27.0 - p2 * p1 / 3.0 + p0;
    let disc = b * b / 4.0 + a * a * a / 27.0;

    let mut roots = if disc > 0.0 {
        let sq = disc.sqrt();
        vec![(-0.5 * b + sq).cbrt() + (-0.5 * b - sq).cbrt() - shift]
    } else if a.abs() < f64::EPSILON {
        vec![-shift]
    } else {
        let m = 2.0 * (-a / 3.0).sqrt();
        let theta = (3.0 * b / (a * m)).clamp(-1.0, 1.0).acos() / 3.0;
        (0..3)
            .map(|k| m * (theta - 2.0 * std::f64::consts::PI * k as f64 / 3.0).cos() - shift)
            .collect()
    };

    for x in roots.iter_mut() {
        let f = ((*x + p2) * *x + p1) * *x + p0;
        let df = (3.0 * *x + 2.0 * p2) * *x + p1;
        if df.abs() > f64::EPSILON {
            *x -= f / df;
        }
    }
    roots
}
