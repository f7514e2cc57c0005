//! Harris corners with normalised intensity-patch descriptors.
//!
//! - Sobel gradients with border clamping, as in the edge stage of most
//!   line/corner detectors.
//! - Structure-tensor sums over a square window, response
//!   `R = det(M) - k · trace(M)²`.
//! - Strict 3×3 non-maximum suppression (plateaus resolve to the first
//!   pixel in raster order), relative threshold against the strongest
//!   response, strongest-N selection.
//! - Descriptor: the `(2r+1)²` intensities around the corner, shifted to
//!   zero mean and scaled to unit L2 norm, so descriptor distances lie in
//!   `[0, 2]` and are insensitive to brightness and contrast changes.
//!
//! Not rotation or scale invariant; adequate for frames that view a document
//! roughly upright at a similar resolution.
use super::{FeatureExtractor, FeatureSet, Keypoint};
use crate::error::ExtractionError;
use crate::image::{ImageF32, ImageU8, ImageView, ImageViewMut};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarrisParams {
    /// Keep at most this many corners (strongest first).
    pub max_features: usize,
    /// Half-size of the structure-tensor window.
    pub window_radius: usize,
    /// Harris sensitivity constant.
    pub k: f32,
    /// Corners must exceed this fraction of the strongest response.
    pub rel_threshold: f32,
    /// Half-size of the descriptor patch.
    pub patch_radius: usize,
    /// Patches flatter than this standard deviation (intensity in `[0, 1]`)
    /// carry no usable descriptor and are dropped.
    pub min_patch_std: f32,
}

impl Default for HarrisParams {
    fn default() -> Self {
        Self {
            max_features: 500,
            window_radius: 2,
            k: 0.04,
            rel_threshold: 0.01,
            patch_radius: 4,
            min_patch_std: 1e-3,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HarrisPatchExtractor {
    params: HarrisParams,
}

impl HarrisPatchExtractor {
    pub fn new(params: HarrisParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &HarrisParams {
        &self.params
    }

    /// Length of every descriptor produced by this extractor.
    pub fn descriptor_dim(&self) -> usize {
        let side = 2 * self.params.patch_radius + 1;
        side * side
    }

    fn margin(&self) -> usize {
        self.params
            .patch_radius
            .max(self.params.window_radius + 1)
    }

    fn response(&self, img: &ImageF32) -> ImageF32 {
        let (gx, gy) = sobel(img);
        let (w, h) = (img.w, img.h);
        let r = self.params.window_radius;
        let mut out = ImageF32::new(w, h);
        for y in r..h.saturating_sub(r) {
            for x in r..w.saturating_sub(r) {
                let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
                for yy in y - r..=y + r {
                    let (rx, ry) = (gx.row(yy), gy.row(yy));
                    for xx in x - r..=x + r {
                        let (dx, dy) = (rx[xx], ry[xx]);
                        sxx += dx * dx;
                        syy += dy * dy;
                        sxy += dx * dy;
                    }
                }
                let det = sxx * syy - sxy * sxy;
                let trace = sxx + syy;
                out.set(x, y, det - self.params.k * trace * trace);
            }
        }
        out
    }

    fn describe(&self, img: &ImageF32, x: usize, y: usize) -> Option<Vec<f32>> {
        let r = self.params.patch_radius;
        let mut patch = Vec::with_capacity(self.descriptor_dim());
        for yy in y - r..=y + r {
            patch.extend_from_slice(&img.row(yy)[x - r..=x + r]);
        }
        let n = patch.len() as f32;
        let mean = patch.iter().sum::<f32>() / n;
        let var = patch.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        if var.sqrt() < self.params.min_patch_std {
            return None;
        }
        let norm = (var * n).sqrt();
        for v in &mut patch {
            *v = (*v - mean) / norm;
        }
        Some(patch)
    }
}

impl FeatureExtractor for HarrisPatchExtractor {
    fn extract(&self, image: ImageU8<'_>) -> Result<FeatureSet, ExtractionError> {
        let image = image.checked()?;
        let dim = self.descriptor_dim();
        let margin = self.margin();
        if image.w <= 2 * margin || image.h <= 2 * margin {
            debug!(
                "HarrisPatchExtractor: image {}x{} smaller than margin {}",
                image.w, image.h, margin
            );
            return Ok(FeatureSet::empty(dim));
        }

        let img = ImageF32::from_u8(image);
        let resp = self.response(&img);
        let threshold = resp.max_value() * self.params.rel_threshold;
        if threshold <= 0.0 {
            return Ok(FeatureSet::empty(dim));
        }

        let mut corners = Vec::new();
        for y in margin..img.h - margin {
            for x in margin..img.w - margin {
                let v = resp.get(x, y);
                if v > threshold && is_local_max(&resp, x, y) {
                    corners.push((v, x, y));
                }
            }
        }
        // Stable: equal responses keep raster order.
        corners.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut pairs = Vec::with_capacity(corners.len().min(self.params.max_features));
        for &(_, x, y) in &corners {
            if pairs.len() >= self.params.max_features {
                break;
            }
            if let Some(desc) = self.describe(&img, x, y) {
                pairs.push((Keypoint::new(x as f32, y as f32), desc));
            }
        }
        debug!(
            "HarrisPatchExtractor: {} candidates, {} kept ({}x{})",
            corners.len(),
            pairs.len(),
            image.w,
            image.h
        );
        FeatureSet::from_pairs(dim, pairs)
    }
}

fn is_local_max(resp: &ImageF32, x: usize, y: usize) -> bool {
    let v = resp.get(x, y);
    for dy in -1isize..=1 {
        for dx in -1isize..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let n = resp.get((x as isize + dx) as usize, (y as isize + dy) as usize);
            let earlier = dy < 0 || (dy == 0 && dx < 0);
            if n > v || (n == v && earlier) {
                return false;
            }
        }
    }
    true
}

const SOBEL_X: [[f32; 3]; 3] = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

fn sobel(l: &ImageF32) -> (ImageF32, ImageF32) {
    let (w, h) = (l.w, l.h);
    let mut gx = ImageF32::new(w, h);
    let mut gy = ImageF32::new(w, h);
    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out_x = gx.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
            let mut sum = 0.0;
            for (ky, row) in rows.iter().enumerate() {
                for (kx, &xi) in x_idx.iter().enumerate() {
                    sum += row[xi] * SOBEL_X[ky][kx];
                }
            }
            out_x[x] = sum;
        }
        let out_y = gy.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];
            let mut sum = 0.0;
            for (ky, row) in rows.iter().enumerate() {
                for (kx, &xi) in x_idx.iter().enumerate() {
                    sum += row[xi] * SOBEL_Y[ky][kx];
                }
            }
            out_y[x] = sum;
        }
    }
    (gx, gy)
}
