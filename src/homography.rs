//! Planar projective transforms: estimation from point pairs and point
//! mapping.
//!
//! Estimation is the normalised direct linear transform: both point sets are
//! translated to their centroid and scaled to a mean distance of √2, the
//! 2n×9 system is solved for the right singular vector of the smallest
//! singular value, and the result is de-normalised with `h33 = 1`.
use nalgebra::{DMatrix, Matrix3, Vector3};

const EPS: f64 = 1e-9;
/// Points closer than this (pixels) are treated as coincident.
const COINCIDENT_PX: f64 = 1e-3;
/// Sine of the smallest angle a point triple may span before it counts as
/// collinear.
const COLLINEAR_SIN: f64 = 1e-3;

/// Map points through `h`; `None` if any point lands at infinity.
pub fn apply_homography_points(h: &Matrix3<f64>, pts: &[[f64; 2]]) -> Option<Vec<[f64; 2]>> {
    pts.iter().map(|&p| apply_homography(h, p)).collect()
}

#[inline]
pub fn apply_homography(h: &Matrix3<f64>, p: [f64; 2]) -> Option<[f64; 2]> {
    let v = h * Vector3::new(p[0], p[1], 1.0);
    let w = v[2];
    if !w.is_finite() || w.abs() <= EPS || !v[0].is_finite() || !v[1].is_finite() {
        return None;
    }
    Some([v[0] / w, v[1] / w])
}

/// Euclidean distance between `h · src` and `dst`; infinite when `src` maps
/// to infinity.
#[inline]
pub fn reprojection_error(h: &Matrix3<f64>, src: [f64; 2], dst: [f64; 2]) -> f64 {
    match apply_homography(h, src) {
        Some(p) => ((p[0] - dst[0]).powi(2) + (p[1] - dst[1]).powi(2)).sqrt(),
        None => f64::INFINITY,
    }
}

/// True when the sample cannot define a homography: two points coincide or
/// three are (nearly) collinear, in either point set.
pub fn is_degenerate_sample(src: &[[f64; 2]], dst: &[[f64; 2]]) -> bool {
    has_degenerate_points(src) || has_degenerate_points(dst)
}

fn has_degenerate_points(pts: &[[f64; 2]]) -> bool {
    let n = pts.len();
    for i in 0..n {
        for j in i + 1..n {
            let (dx, dy) = (pts[j][0] - pts[i][0], pts[j][1] - pts[i][1]);
            if (dx * dx + dy * dy).sqrt() < COINCIDENT_PX {
                return true;
            }
            for k in j + 1..n {
                let (ex, ey) = (pts[k][0] - pts[i][0], pts[k][1] - pts[i][1]);
                let cross = (dx * ey - dy * ex).abs();
                let lens = (dx * dx + dy * dy).sqrt() * (ex * ex + ey * ey).sqrt();
                if lens < EPS || cross / lens < COLLINEAR_SIN {
                    return true;
                }
            }
        }
    }
    false
}

/// Similarity transform moving the centroid to the origin with mean
/// distance √2.
fn normalization(pts: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean < EPS {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean;
    Some(Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0))
}

/// Least-squares homography mapping `src[i]` to `dst[i]` (n ≥ 4).
///
/// Returns `None` for mismatched or too short inputs and for configurations
/// that do not determine a finite, invertible transform.
pub fn estimate_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Option<Matrix3<f64>> {
    let n = src.len();
    if n < 4 || dst.len() != n {
        return None;
    }
    let ts = normalization(src)?;
    let td = normalization(dst)?;

    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (s, d)) in src.iter().zip(dst).enumerate() {
        let p = ts * Vector3::new(s[0], s[1], 1.0);
        let q = td * Vector3::new(d[0], d[1], 1.0);
        let (x1, y1) = (p[0], p[1]);
        let (x2, y2) = (q[0], q[1]);
        let r1 = 2 * i;
        let r2 = r1 + 1;
        a[(r1, 0)] = -x1;
        a[(r1, 1)] = -y1;
        a[(r1, 2)] = -1.0;
        a[(r1, 6)] = x2 * x1;
        a[(r1, 7)] = x2 * y1;
        a[(r1, 8)] = x2;
        a[(r2, 3)] = -x1;
        a[(r2, 4)] = -y1;
        a[(r2, 5)] = -1.0;
        a[(r2, 6)] = y2 * x1;
        a[(r2, 7)] = y2 * y1;
        a[(r2, 8)] = y2;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (min_idx, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = v_t.row(min_idx);
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let h = td.try_inverse()? * hn * ts;
    let scale = h[(2, 2)];
    if !scale.is_finite() || scale.abs() < EPS {
        return None;
    }
    let h = h / scale;
    if h.iter().any(|v| !v.is_finite()) || h.determinant().abs() < EPS {
        return None;
    }
    Some(h)
}
