//! Synthetic documents, frames and descriptor sets for integration tests.
use doc_locator::error::ExtractionError;
use doc_locator::features::{FeatureExtractor, FeatureSet, Keypoint};
use doc_locator::homography::apply_homography;
use doc_locator::image::{GrayImageU8, ImageU8};
use nalgebra::Matrix3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

pub const DESCRIPTOR_DIM: usize = 32;

/// White page with dark, lightly textured rectangles ("text blocks").
pub fn document_image(width: usize, height: usize, blocks: usize, seed: u64) -> GrayImageU8 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = GrayImageU8::filled(width, height, 255);
    for _ in 0..blocks {
        let bw = rng.gen_range(20..80).min(width - 1);
        let bh = rng.gen_range(15..60).min(height - 1);
        let x0 = rng.gen_range(0..width - bw);
        let y0 = rng.gen_range(0..height - bh);
        let base: i32 = rng.gen_range(40..150);
        for y in y0..y0 + bh {
            for x in x0..x0 + bw {
                let v = base + rng.gen_range(-8..=8);
                img.set(x, y, v.clamp(0, 255) as u8);
            }
        }
    }
    img
}

/// Frame of size `width × height` whose pixel `(x, y)` shows the reference
/// pixel at `frame_to_ref · (x, y)`; outside the reference is white.
pub fn warp_frame(
    reference: &GrayImageU8,
    frame_to_ref: &Matrix3<f64>,
    width: usize,
    height: usize,
) -> GrayImageU8 {
    GrayImageU8::from_fn(width, height, |x, y| {
        match apply_homography(frame_to_ref, [x as f64, y as f64]) {
            Some([rx, ry]) => {
                let (ix, iy) = (rx.round(), ry.round());
                if ix >= 0.0
                    && iy >= 0.0
                    && (ix as usize) < reference.width()
                    && (iy as usize) < reference.height()
                {
                    reference.get(ix as usize, iy as usize)
                } else {
                    255
                }
            }
            None => 255,
        }
    })
}

pub fn random_descriptor(rng: &mut StdRng) -> Vec<f32> {
    (0..DESCRIPTOR_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn perturbed(desc: &[f32], rng: &mut StdRng, amplitude: f32) -> Vec<f32> {
    desc.iter()
        .map(|v| v + rng.gen_range(-amplitude..amplitude))
        .collect()
}

fn random_point(rng: &mut StdRng, width: usize, height: usize) -> [f64; 2] {
    [
        rng.gen_range(5.0..width as f64 - 5.0),
        rng.gen_range(5.0..height as f64 - 5.0),
    ]
}

fn random_features(rng: &mut StdRng, count: usize, width: usize, height: usize) -> FeatureSet {
    let pairs: Vec<(Keypoint, Vec<f32>)> = (0..count)
        .map(|_| {
            let p = random_point(rng, width, height);
            (
                Keypoint::new(p[0] as f32, p[1] as f32),
                random_descriptor(rng),
            )
        })
        .collect();
    FeatureSet::from_pairs(DESCRIPTOR_DIM, pairs).unwrap()
}

/// Extractor answering from a precomputed table keyed by image size, so a
/// test controls exactly which descriptors each image "has". Unknown sizes
/// yield an empty set.
#[derive(Clone, Debug, Default)]
pub struct TableExtractor {
    pub table: HashMap<(usize, usize), FeatureSet>,
}

impl FeatureExtractor for TableExtractor {
    fn extract(&self, image: ImageU8<'_>) -> Result<FeatureSet, ExtractionError> {
        Ok(self
            .table
            .get(&(image.w, image.h))
            .cloned()
            .unwrap_or_else(|| FeatureSet::empty(DESCRIPTOR_DIM)))
    }
}

pub struct Scenario {
    /// `(id, image)` in index order; `doc2.png` is the one the frame shows.
    pub documents: Vec<(String, GrayImageU8)>,
    pub frame: GrayImageU8,
    pub extractor: TableExtractor,
    /// Frame → `doc2.png` homography the frame was rendered with.
    pub frame_to_doc: Matrix3<f64>,
}

pub const FRAME_W: usize = 320;
pub const FRAME_H: usize = 240;
const DOC_SIZES: [(usize, usize); 3] = [(400, 300), (420, 320), (380, 300)];

pub fn frame_to_doc() -> Matrix3<f64> {
    Matrix3::new(0.9, 0.06, 45.0, -0.04, 0.95, 35.0, 1.2e-4, 6e-5, 1.0)
}

/// Three documents; the frame is a perspective view of `doc2.png` sharing
/// `true_pairs` descriptors with it, plus `query_outliers` unrelated frame
/// descriptors. The other two documents share nothing with the frame.
pub fn three_documents(true_pairs: usize, query_outliers: usize, seed: u64) -> Scenario {
    let mut rng = StdRng::seed_from_u64(seed);
    let h = frame_to_doc();

    let documents: Vec<(String, GrayImageU8)> = DOC_SIZES
        .iter()
        .enumerate()
        .map(|(i, &(w, ht))| {
            (
                format!("doc{}.png", i + 1),
                document_image(w, ht, 30, seed + i as u64 + 1),
            )
        })
        .collect();
    let frame = warp_frame(&documents[1].1, &h, FRAME_W, FRAME_H);

    let mut query_pairs = Vec::new();
    let mut doc2_pairs = Vec::new();
    for _ in 0..true_pairs {
        let q = random_point(&mut rng, FRAME_W, FRAME_H);
        let Some(r) = apply_homography(&h, q) else {
            continue;
        };
        let desc = random_descriptor(&mut rng);
        query_pairs.push((
            Keypoint::new(q[0] as f32, q[1] as f32),
            perturbed(&desc, &mut rng, 0.01),
        ));
        doc2_pairs.push((Keypoint::new(r[0] as f32, r[1] as f32), desc));
    }
    for _ in 0..query_outliers {
        let q = random_point(&mut rng, FRAME_W, FRAME_H);
        query_pairs.push((
            Keypoint::new(q[0] as f32, q[1] as f32),
            random_descriptor(&mut rng),
        ));
    }
    // Reference-only clutter so doc2 is not made of true pairs alone.
    for _ in 0..20 {
        let r = random_point(&mut rng, DOC_SIZES[1].0, DOC_SIZES[1].1);
        doc2_pairs.push((
            Keypoint::new(r[0] as f32, r[1] as f32),
            random_descriptor(&mut rng),
        ));
    }

    let mut table = HashMap::new();
    table.insert(
        (FRAME_W, FRAME_H),
        FeatureSet::from_pairs(DESCRIPTOR_DIM, query_pairs).unwrap(),
    );
    table.insert(
        DOC_SIZES[1],
        FeatureSet::from_pairs(DESCRIPTOR_DIM, doc2_pairs).unwrap(),
    );
    for &(w, ht) in [DOC_SIZES[0], DOC_SIZES[2]].iter() {
        table.insert((w, ht), random_features(&mut rng, 80, w, ht));
    }

    Scenario {
        documents,
        frame,
        extractor: TableExtractor { table },
        frame_to_doc: h,
    }
}
