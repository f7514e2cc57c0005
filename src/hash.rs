//! Difference hash ("dHash") fingerprints.
//!
//! The image is reduced to a `(HASH_SIZE + 1) × HASH_SIZE` intensity grid
//! and each bit records whether intensity increases from one column to the
//! next. Bits are emitted row-major, first comparison in the most
//! significant bit. The layout is fixed: stored fingerprints stay
//! comparable only as long as it is reproduced exactly.
use crate::error::ExtractionError;
use crate::image::resize::resize_bilinear;
use crate::image::{ImageU8, ImageView};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grid side of the hash; yields `HASH_SIZE²` = 64 bits.
pub const HASH_SIZE: usize = 8;

/// 64-bit perceptual fingerprint. Serialized as 16 lowercase hex digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Canonical textual form: exactly 16 lowercase hex digits.
    pub fn to_hex(self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, String> {
        if s.len() != 16 {
            return Err(format!("fingerprint `{s}` must have 16 hex digits"));
        }
        u64::from_str_radix(s, 16)
            .map(Fingerprint)
            .map_err(|e| format!("fingerprint `{s}`: {e}"))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

/// How two fingerprints are compared during candidate ranking.
///
/// `AbsoluteDifference` compares the fingerprints as integers, so a flip in a
/// leading bit outweighs any number of trailing flips. It is the default to
/// keep rankings identical to previously deployed indexes. `Hamming` counts
/// differing bits, which is the usual perceptual-hash metric; switching
/// changes which candidates make the shortlist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashMetric {
    #[default]
    AbsoluteDifference,
    Hamming,
}

impl HashMetric {
    #[inline]
    pub fn distance(self, a: Fingerprint, b: Fingerprint) -> u64 {
        match self {
            HashMetric::AbsoluteDifference => a.0.abs_diff(b.0),
            HashMetric::Hamming => (a.0 ^ b.0).count_ones() as u64,
        }
    }
}

/// Compute the fingerprint of a grayscale image.
pub fn compute_hash(image: ImageU8<'_>) -> Result<Fingerprint, ExtractionError> {
    let image = image.checked()?;
    if image.is_empty() {
        return Err(ExtractionError::EmptyImage {
            width: image.w,
            height: image.h,
        });
    }
    let grid = resize_bilinear(image, HASH_SIZE + 1, HASH_SIZE);
    let mut bits = 0u64;
    for row in grid.rows() {
        for pair in row.windows(2) {
            bits = (bits << 1) | u64::from(pair[1] > pair[0]);
        }
    }
    Ok(Fingerprint(bits))
}
