//! Colour to intensity conversion.
//!
//! Uses the BT.601 luma weights in 14-bit fixed point, the integer policy
//! of mainstream vision toolkits, so fingerprints computed here agree with
//! fingerprints computed from the same pixels elsewhere.
use super::u8::GrayImageU8;

const SHIFT: u32 = 14;
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;

/// Luma of a single RGB pixel.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT + (1 << (SHIFT - 1));
    (y >> SHIFT).min(255) as u8
}

/// Convert packed RGB8 to grayscale; `None` unless `rgb` holds exactly
/// `3 * width * height` bytes.
pub fn rgb_to_gray(width: usize, height: usize, rgb: &[u8]) -> Option<GrayImageU8> {
    if width.checked_mul(height).and_then(|n| n.checked_mul(3)) != Some(rgb.len()) {
        return None;
    }
    let data = rgb
        .chunks_exact(3)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();
    GrayImageU8::try_new(width, height, data)
}
