//! Geometric verification of the best candidate.
//!
//! Correspondences are treated as point pairs (query frame → reference
//! document) and a homography is fitted with RANSAC:
//! 1. Draw 4 pairs; re-draw while the sample is degenerate (coincident or
//!    collinear points in either image).
//! 2. Fit a homography to the sample and count pairs whose reprojection
//!    error is below the pixel threshold.
//! 3. Keep the model with the most inliers and shrink the iteration budget
//!    to the number of draws needed to hit an all-inlier sample with the
//!    requested confidence.
//! 4. Refit on all inliers of the best model; the refit replaces it only if
//!    it keeps at least as many inliers.
//!
//! The query frame's corners mapped through the result give the localized
//! region in document coordinates.
use crate::features::FeatureSet;
use crate::homography::{apply_homography_points, estimate_dlt, is_degenerate_sample, reprojection_error};
use crate::matching::Correspondence;
use log::debug;
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

const SAMPLE_SIZE: usize = 4;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyParams {
    /// Fewer correspondences than this are not worth a geometric fit.
    pub min_matches: usize,
    /// Inlier threshold on the reprojection error, in reference pixels.
    pub reproj_threshold_px: f64,
    /// Upper bound on RANSAC draws.
    pub max_iterations: usize,
    /// Probability of having drawn at least one all-inlier sample before
    /// stopping early.
    pub confidence: f64,
    /// Smallest inlier support accepted for a transform (never below 4).
    /// Any 4 pairs fit some homography exactly, so a useful bar sits well
    /// above the sample size.
    pub min_inliers: usize,
    /// Smallest fraction of the correspondences that must be inliers.
    pub min_inlier_ratio: f64,
    /// Re-draws allowed per iteration when a sample is degenerate.
    pub max_degenerate_resamples: usize,
    /// Seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for VerifyParams {
    fn default() -> Self {
        Self {
            min_matches: 10,
            reproj_threshold_px: 5.0,
            max_iterations: 2000,
            confidence: 0.995,
            min_inliers: 10,
            min_inlier_ratio: 0.25,
            max_degenerate_resamples: 100,
            seed: Some(0x5eed),
        }
    }
}

/// Why no transform was produced. Both are ordinary outcomes: the document
/// is still identified, only its localization is withheld.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    InsufficientCorrespondences { found: usize, required: usize },
    NoConsistentTransform,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::InsufficientCorrespondences { .. } => "insufficient correspondences",
            Rejection::NoConsistentTransform => "no consistent transform",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Query-to-reference homography and the correspondences supporting it.
#[derive(Clone, Debug, Serialize)]
pub struct Transform {
    pub matrix: Matrix3<f64>,
    pub inliers: Vec<Correspondence>,
}

/// Quadrilateral in reference coordinates: the query frame's top-left,
/// top-right, bottom-right and bottom-left corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [[f64; 2]; 4]);

impl Quad {
    /// Largest corner displacement between two quads.
    pub fn max_corner_distance(&self, other: &Quad) -> f64 {
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt())
            .fold(0.0, f64::max)
    }
}

/// Successful verification: the transform and the projected frame outline.
#[derive(Clone, Debug, Serialize)]
pub struct Localized {
    pub transform: Transform,
    pub quad: Quad,
}

/// Corners `(0,0) (w,0) (w,h) (0,h)` of a `w × h` frame mapped through `h`.
pub fn project_corners(h: &Matrix3<f64>, width: usize, height: usize) -> Option<Quad> {
    let (w, ht) = (width as f64, height as f64);
    let pts = apply_homography_points(h, &[[0.0, 0.0], [w, 0.0], [w, ht], [0.0, ht]])?;
    Some(Quad([pts[0], pts[1], pts[2], pts[3]]))
}

#[derive(Clone, Debug, Default)]
pub struct GeometricVerifier {
    params: VerifyParams,
}

impl GeometricVerifier {
    pub fn new(params: VerifyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &VerifyParams {
        &self.params
    }

    /// Fit a transform to `correspondences` between `query` and `reference`
    /// features.
    ///
    /// Correspondences indexing past either feature set are dropped before
    /// fitting and count as missing.
    pub fn verify(
        &self,
        correspondences: &[Correspondence],
        query: &FeatureSet,
        reference: &FeatureSet,
    ) -> Result<Transform, Rejection> {
        let usable: Vec<Correspondence> = correspondences
            .iter()
            .filter(|c| c.query_index < query.len() && c.reference_index < reference.len())
            .copied()
            .collect();
        if usable.len() < correspondences.len() {
            debug!(
                "GeometricVerifier: dropped {} correspondences with out-of-range indices",
                correspondences.len() - usable.len()
            );
        }
        let (src, dst): (Vec<[f64; 2]>, Vec<[f64; 2]>) = usable
            .iter()
            .map(|c| {
                (
                    query.keypoint(c.query_index).to_f64(),
                    reference.keypoint(c.reference_index).to_f64(),
                )
            })
            .unzip();
        let (matrix, mask) = self.verify_points(&src, &dst)?;
        let inliers = usable
            .iter()
            .zip(&mask)
            .filter(|(_, &keep)| keep)
            .map(|(c, _)| *c)
            .collect();
        Ok(Transform { matrix, inliers })
    }

    /// Verify and project the corners of the `frame_w × frame_h` query frame.
    pub fn localize(
        &self,
        correspondences: &[Correspondence],
        query: &FeatureSet,
        reference: &FeatureSet,
        frame_w: usize,
        frame_h: usize,
    ) -> Result<Localized, Rejection> {
        let transform = self.verify(correspondences, query, reference)?;
        let quad = project_corners(&transform.matrix, frame_w, frame_h).ok_or_else(|| {
            debug!("GeometricVerifier: frame corner maps to infinity");
            Rejection::NoConsistentTransform
        })?;
        Ok(Localized { transform, quad })
    }

    /// RANSAC on raw point pairs; returns the homography and the inlier mask.
    pub fn verify_points(
        &self,
        src: &[[f64; 2]],
        dst: &[[f64; 2]],
    ) -> Result<(Matrix3<f64>, Vec<bool>), Rejection> {
        let n = src.len().min(dst.len());
        let required = self.params.min_matches.max(SAMPLE_SIZE);
        if n < required {
            return Err(Rejection::InsufficientCorrespondences { found: n, required });
        }
        let (src, dst) = (&src[..n], &dst[..n]);

        let Some((h, mask, count, iterations)) = self.ransac(src, dst) else {
            debug!("GeometricVerifier: no non-degenerate model among {n} pairs");
            return Err(Rejection::NoConsistentTransform);
        };
        if count < self.min_support(n) {
            debug!("GeometricVerifier: best model has only {count}/{n} inliers");
            return Err(Rejection::NoConsistentTransform);
        }

        let (h, mask, count) = self.refit(src, dst, h, mask, count);
        debug!(
            "GeometricVerifier: inliers={}/{} iterations={}",
            count, n, iterations
        );
        Ok((h, mask))
    }

    /// Inliers required among `n` correspondences.
    fn min_support(&self, n: usize) -> usize {
        let by_ratio = (self.params.min_inlier_ratio.clamp(0.0, 1.0) * n as f64).ceil() as usize;
        self.params.min_inliers.max(SAMPLE_SIZE).max(by_ratio)
    }

    fn ransac(
        &self,
        src: &[[f64; 2]],
        dst: &[[f64; 2]],
    ) -> Option<(Matrix3<f64>, Vec<bool>, usize, usize)> {
        let n = src.len();
        let mut rng = match self.params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut best: Option<(Matrix3<f64>, Vec<bool>, usize)> = None;
        let mut budget = self.params.max_iterations;
        let mut iterations = 0usize;

        while iterations < budget {
            iterations += 1;
            let Some((s, d)) = self.draw_sample(&mut rng, src, dst) else {
                continue;
            };
            let Some(h) = estimate_dlt(&s, &d) else {
                continue;
            };
            let (mask, count) = self.inlier_mask(&h, src, dst);
            if best.as_ref().map_or(true, |b| count > b.2) {
                budget = budget.min(required_iterations(count, n, self.params.confidence, budget));
                best = Some((h, mask, count));
            }
        }
        best.map(|(h, mask, count)| (h, mask, count, iterations))
    }

    fn draw_sample(
        &self,
        rng: &mut StdRng,
        src: &[[f64; 2]],
        dst: &[[f64; 2]],
    ) -> Option<([[f64; 2]; SAMPLE_SIZE], [[f64; 2]; SAMPLE_SIZE])> {
        for _ in 0..=self.params.max_degenerate_resamples {
            let idx = rand::seq::index::sample(rng, src.len(), SAMPLE_SIZE);
            let mut s = [[0.0; 2]; SAMPLE_SIZE];
            let mut d = [[0.0; 2]; SAMPLE_SIZE];
            for (slot, i) in idx.iter().enumerate() {
                s[slot] = src[i];
                d[slot] = dst[i];
            }
            if !is_degenerate_sample(&s, &d) {
                return Some((s, d));
            }
        }
        None
    }

    fn inlier_mask(
        &self,
        h: &Matrix3<f64>,
        src: &[[f64; 2]],
        dst: &[[f64; 2]],
    ) -> (Vec<bool>, usize) {
        let thr = self.params.reproj_threshold_px;
        let mask: Vec<bool> = src
            .iter()
            .zip(dst)
            .map(|(s, d)| reprojection_error(h, *s, *d) < thr)
            .collect();
        let count = mask.iter().filter(|&&m| m).count();
        (mask, count)
    }

    fn refit(
        &self,
        src: &[[f64; 2]],
        dst: &[[f64; 2]],
        h: Matrix3<f64>,
        mask: Vec<bool>,
        count: usize,
    ) -> (Matrix3<f64>, Vec<bool>, usize) {
        let (s, d): (Vec<[f64; 2]>, Vec<[f64; 2]>) = src
            .iter()
            .zip(dst)
            .zip(&mask)
            .filter(|(_, &m)| m)
            .map(|((s, d), _)| (*s, *d))
            .unzip();
        match estimate_dlt(&s, &d) {
            Some(refined) => {
                let (refined_mask, refined_count) = self.inlier_mask(&refined, src, dst);
                if refined_count >= count {
                    (refined, refined_mask, refined_count)
                } else {
                    (h, mask, count)
                }
            }
            None => (h, mask, count),
        }
    }
}

/// Draws needed to pick an all-inlier sample with probability `confidence`
/// given `inliers` out of `n`, capped at `max`.
fn required_iterations(inliers: usize, n: usize, confidence: f64, max: usize) -> usize {
    let inlier_ratio = inliers as f64 / n.max(1) as f64;
    let num = (1.0 - confidence.clamp(0.0, 1.0)).max(f64::MIN_POSITIVE).ln();
    let all_inlier = inlier_ratio.powi(SAMPLE_SIZE as i32);
    let denom = 1.0 - all_inlier;
    if denom < f64::MIN_POSITIVE {
        return 0;
    }
    let denom = denom.ln();
    if denom >= 0.0 || -num >= max as f64 * -denom {
        return max;
    }
    (num / denom).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Keypoint;
    use rand::Rng;

    fn feature_set(points: &[[f64; 2]]) -> FeatureSet {
        FeatureSet::from_pairs(
            1,
            points
                .iter()
                .enumerate()
                .map(|(i, p)| (Keypoint::new(p[0] as f32, p[1] as f32), vec![i as f32])),
        )
        .unwrap()
    }

    fn identity_pairs(n: usize) -> Vec<Correspondence> {
        (0..n)
            .map(|i| Correspondence {
                query_index: i,
                reference_index: i,
                distance: 0.0,
            })
            .collect()
    }

    fn scattered_points(n: usize, seed: u64) -> Vec<[f64; 2]> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| [rng.gen_range(0.0..320.0), rng.gen_range(0.0..240.0)])
            .collect()
    }

    #[test]
    fn too_few_correspondences_are_rejected() {
        let pts = scattered_points(9, 1);
        let set = feature_set(&pts);
        let verifier = GeometricVerifier::default();
        let err = verifier.verify(&identity_pairs(9), &set, &set).unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientCorrespondences {
                found: 9,
                required: 10
            }
        );
        assert_eq!(err.to_string(), "insufficient correspondences");
    }

    #[test]
    fn identity_transform_projects_frame_onto_itself() {
        let pts = scattered_points(30, 2);
        let set = feature_set(&pts);
        let verifier = GeometricVerifier::default();
        let localized = verifier
            .localize(&identity_pairs(30), &set, &set, 320, 240)
            .unwrap();
        let expected = Quad([[0.0, 0.0], [320.0, 0.0], [320.0, 240.0], [0.0, 240.0]]);
        assert!(localized.quad.max_corner_distance(&expected) < 1e-3);
        assert_eq!(localized.transform.inliers.len(), 30);
    }

    #[test]
    fn recovers_transform_despite_outliers() {
        let h = Matrix3::new(0.8, 0.05, 120.0, -0.04, 0.85, 60.0, 1e-4, 5e-5, 1.0);
        let src = scattered_points(60, 3);
        let mut dst = apply_homography_points(&h, &src).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        for d in dst.iter_mut().skip(40) {
            *d = [rng.gen_range(0.0..600.0), rng.gen_range(0.0..400.0)];
        }
        let (est, mask) = GeometricVerifier::default().verify_points(&src, &dst).unwrap();
        assert!(mask[..40].iter().all(|&m| m));
        assert!(mask[40..].iter().filter(|&&m| m).count() <= 2);

        let truth = project_corners(&h, 320, 240).unwrap();
        let found = project_corners(&est, 320, 240).unwrap();
        assert!(truth.max_corner_distance(&found) < 0.5);
    }

    #[test]
    fn collinear_points_give_no_transform() {
        let src: Vec<[f64; 2]> = (0..20).map(|i| [i as f64 * 10.0, i as f64 * 5.0]).collect();
        let err = GeometricVerifier::default()
            .verify_points(&src, &src)
            .unwrap_err();
        assert_eq!(err, Rejection::NoConsistentTransform);
        assert_eq!(err.reason(), "no consistent transform");
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let h = Matrix3::new(1.1, 0.0, 5.0, 0.0, 1.1, -3.0, 0.0, 0.0, 1.0);
        let src = scattered_points(25, 5);
        let mut dst = apply_homography_points(&h, &src).unwrap();
        dst[3] = [0.0, 0.0];
        let verifier = GeometricVerifier::default();
        let a = verifier.verify_points(&src, &dst).unwrap();
        let b = verifier.verify_points(&src, &dst).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unrelated_pairs_have_no_consistent_transform() {
        let src = scattered_points(40, 6);
        let dst = scattered_points(40, 7);
        let err = GeometricVerifier::default()
            .verify_points(&src, &dst)
            .unwrap_err();
        assert_eq!(err, Rejection::NoConsistentTransform);
    }

    #[test]
    fn inlier_bar_scales_with_correspondence_count() {
        let verifier = GeometricVerifier::default();
        assert_eq!(verifier.min_support(12), 10);
        assert_eq!(verifier.min_support(100), 25);
        let lenient = GeometricVerifier::new(VerifyParams {
            min_inliers: 0,
            min_inlier_ratio: 0.0,
            ..Default::default()
        });
        assert_eq!(lenient.min_support(100), SAMPLE_SIZE);
    }

    #[test]
    fn out_of_range_correspondences_are_dropped() {
        let pts = scattered_points(9, 8);
        let set = feature_set(&pts);
        let mut pairs = identity_pairs(9);
        pairs.push(Correspondence {
            query_index: 9,
            reference_index: 0,
            distance: 0.0,
        });
        pairs.push(Correspondence {
            query_index: 0,
            reference_index: 50,
            distance: 0.0,
        });
        pairs.push(Correspondence {
            query_index: usize::MAX,
            reference_index: usize::MAX,
            distance: 0.0,
        });
        let err = GeometricVerifier::default()
            .verify(&pairs, &set, &set)
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::InsufficientCorrespondences {
                found: 9,
                required: 10
            }
        );

        let pts = scattered_points(20, 9);
        let set = feature_set(&pts);
        let mut pairs = identity_pairs(20);
        pairs.insert(
            5,
            Correspondence {
                query_index: 40,
                reference_index: 3,
                distance: 0.0,
            },
        );
        let transform = GeometricVerifier::default()
            .verify(&pairs, &set, &set)
            .unwrap();
        assert_eq!(transform.inliers, identity_pairs(20));
    }

    #[test]
    fn iteration_budget_shrinks_with_inlier_ratio() {
        assert_eq!(required_iterations(10, 10, 0.995, 2000), 0);
        let half = required_iterations(50, 100, 0.995, 2000);
        let most = required_iterations(90, 100, 0.995, 2000);
        assert!(most < half && half < 2000, "half={half} most={most}");
        assert_eq!(required_iterations(0, 100, 0.995, 2000), 2000);
    }
}
