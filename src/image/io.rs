//! Image and JSON file helpers.
//!
//! - `load_image`: decode a PNG/JPEG/BMP file into 8-bit intensity.
//! - `list_images`: enumerate the `.png`/`.jpg` files of a folder by name.
//! - `save_gray_png`: write an owned gray buffer to a PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::color::rgb_to_gray;
use super::u8::GrayImageU8;
use crate::error::ExtractionError;
use image::{DynamicImage, GrayImage};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Decode an image from disk and convert it to 8-bit grayscale.
pub fn load_image(path: &Path) -> Result<GrayImageU8, ExtractionError> {
    let bytes = fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_image(&bytes).map_err(|reason| ExtractionError::Decode {
        path: path.to_path_buf(),
        reason,
    })
}

/// Decode an in-memory encoded image.
pub fn decode_image(bytes: &[u8]) -> Result<GrayImageU8, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    to_gray(img).ok_or_else(|| "decoded pixel buffer does not match its dimensions".to_string())
}

fn to_gray(img: DynamicImage) -> Option<GrayImageU8> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    match img {
        DynamicImage::ImageLuma8(gray) => GrayImageU8::try_new(w, h, gray.into_raw()),
        other => rgb_to_gray(w, h, other.into_rgb8().as_raw()),
    }
}

/// List image files (by extension, case-insensitive) sorted by file name.
pub fn list_images(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                IMAGE_EXTENSIONS
                    .iter()
                    .any(|known| e.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);
        if matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Save an 8-bit grayscale buffer to a PNG.
pub fn save_gray_png(buffer: &GrayImageU8, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let image = GrayImage::from_raw(
        buffer.width() as u32,
        buffer.height() as u32,
        buffer.data().to_vec(),
    )
    .ok_or_else(|| "Failed to create image buffer".to_string())?;
    image
        .save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
