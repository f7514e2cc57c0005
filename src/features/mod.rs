//! Local features: keypoints paired with fixed-length descriptors.
//!
//! Feature extraction is a collaborator of the locator, not part of it. Any
//! detector/descriptor pair can be plugged in through [`FeatureExtractor`];
//! [`HarrisPatchExtractor`] is a small self-contained implementation used by
//! the command-line tool.
mod harris;

pub use harris::{HarrisParams, HarrisPatchExtractor};

use crate::error::ExtractionError;
use crate::image::ImageU8;
use serde::{Deserialize, Serialize};

/// Location of a feature in its image's pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_f64(self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }
}

/// Keypoints and their descriptors for one image.
///
/// Descriptors are stored flat, `dim` values per keypoint, in keypoint
/// order. The pairing is validated on construction and on deserialization,
/// so an index `i < len()` is always valid for both.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FeatureSetRepr", into = "FeatureSetRepr")]
pub struct FeatureSet {
    dim: usize,
    keypoints: Vec<Keypoint>,
    descriptors: Vec<f32>,
}

#[derive(Clone, Serialize, Deserialize)]
struct FeatureSetRepr {
    dim: usize,
    keypoints: Vec<Keypoint>,
    descriptors: Vec<f32>,
}

impl TryFrom<FeatureSetRepr> for FeatureSet {
    type Error = ExtractionError;

    fn try_from(r: FeatureSetRepr) -> Result<Self, Self::Error> {
        FeatureSet::new(r.dim, r.keypoints, r.descriptors)
    }
}

impl From<FeatureSet> for FeatureSetRepr {
    fn from(f: FeatureSet) -> Self {
        Self {
            dim: f.dim,
            keypoints: f.keypoints,
            descriptors: f.descriptors,
        }
    }
}

impl FeatureSet {
    /// Build from flat descriptor storage.
    pub fn new(
        dim: usize,
        keypoints: Vec<Keypoint>,
        descriptors: Vec<f32>,
    ) -> Result<Self, ExtractionError> {
        if dim == 0 && !keypoints.is_empty() {
            return Err(ExtractionError::InvalidFeatures(
                "descriptor dimension must be positive".into(),
            ));
        }
        if descriptors.len() != keypoints.len() * dim {
            return Err(ExtractionError::InvalidFeatures(format!(
                "{} keypoints need {} descriptor values of dim {dim}, got {}",
                keypoints.len(),
                keypoints.len() * dim,
                descriptors.len()
            )));
        }
        if let Some(pos) = descriptors.iter().position(|v| !v.is_finite()) {
            return Err(ExtractionError::InvalidFeatures(format!(
                "non-finite descriptor value for keypoint {}",
                pos / dim
            )));
        }
        Ok(Self {
            dim,
            keypoints,
            descriptors,
        })
    }

    /// Build from `(keypoint, descriptor)` pairs; every descriptor must have
    /// length `dim`.
    pub fn from_pairs<I>(dim: usize, pairs: I) -> Result<Self, ExtractionError>
    where
        I: IntoIterator<Item = (Keypoint, Vec<f32>)>,
    {
        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        for (idx, (kp, desc)) in pairs.into_iter().enumerate() {
            if desc.len() != dim {
                return Err(ExtractionError::InvalidFeatures(format!(
                    "descriptor {idx} has length {}, expected {dim}",
                    desc.len()
                )));
            }
            keypoints.push(kp);
            descriptors.extend(desc);
        }
        Self::new(dim, keypoints, descriptors)
    }

    /// Feature set without any feature.
    pub fn empty(dim: usize) -> Self {
        Self {
            dim,
            keypoints: Vec::new(),
            descriptors: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    #[inline]
    pub fn keypoint(&self, i: usize) -> Keypoint {
        self.keypoints[i]
    }

    #[inline]
    pub fn descriptor(&self, i: usize) -> &[f32] {
        &self.descriptors[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Keypoint, &[f32])> + '_ {
        self.keypoints
            .iter()
            .copied()
            .zip(self.descriptors.chunks_exact(self.dim.max(1)))
    }
}

/// External capability turning an image into a [`FeatureSet`].
///
/// Implementations must be usable from several threads at once: the index
/// build calls `extract` in parallel and no global extractor instance exists.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, image: ImageU8<'_>) -> Result<FeatureSet, ExtractionError>;
}

impl<F> FeatureExtractor for F
where
    F: Fn(ImageU8<'_>) -> Result<FeatureSet, ExtractionError> + Send + Sync,
{
    fn extract(&self, image: ImageU8<'_>) -> Result<FeatureSet, ExtractionError> {
        self(image)
    }
}
