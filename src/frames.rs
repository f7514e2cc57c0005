//! Query frame sources.
//!
//! The locator consumes a single grayscale frame. Video decoding is left to
//! the caller; these sources cover a directory of already extracted frames
//! and a single still image. The frame policy is fixed: the frame at index
//! `count / 2` is the query.
use crate::error::{ExtractionError, FrameError};
use crate::image::io::{list_images, load_image};
use crate::image::GrayImageU8;
use log::debug;
use std::path::{Path, PathBuf};

pub trait FrameSource {
    fn frame_count(&self) -> usize;
    fn read_frame(&self, index: usize) -> Result<GrayImageU8, FrameError>;
}

/// Index of the query frame in a source with `count` frames.
pub fn middle_index(count: usize) -> Option<usize> {
    (count > 0).then_some(count / 2)
}

/// Read the middle frame of `source`.
pub fn middle_frame<S: FrameSource + ?Sized>(source: &S) -> Result<GrayImageU8, FrameError> {
    let count = source.frame_count();
    let index = middle_index(count).ok_or(FrameError::NoFrames)?;
    debug!("middle_frame index={} of {}", index, count);
    source.read_frame(index)
}

/// Frames stored as individual image files, ordered by file name.
#[derive(Clone, Debug)]
pub struct ImageSequence {
    frames: Vec<PathBuf>,
}

impl ImageSequence {
    /// All `.png`/`.jpg` files in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, FrameError> {
        let frames = list_images(dir).map_err(|source| {
            FrameError::Read(ExtractionError::Io {
                path: dir.to_path_buf(),
                source,
            })
        })?;
        Ok(Self { frames })
    }

    pub fn from_paths(frames: Vec<PathBuf>) -> Self {
        Self { frames }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.frames
    }
}

impl FrameSource for ImageSequence {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&self, index: usize) -> Result<GrayImageU8, FrameError> {
        let path = self.frames.get(index).ok_or(FrameError::OutOfRange {
            index,
            count: self.frames.len(),
        })?;
        Ok(load_image(path)?)
    }
}

/// A single image acting as a one-frame source.
#[derive(Clone, Debug)]
pub enum StillImage {
    File(PathBuf),
    Decoded(GrayImageU8),
}

impl FrameSource for StillImage {
    fn frame_count(&self) -> usize {
        1
    }

    fn read_frame(&self, index: usize) -> Result<GrayImageU8, FrameError> {
        if index != 0 {
            return Err(FrameError::OutOfRange { index, count: 1 });
        }
        match self {
            StillImage::File(path) => Ok(load_image(path)?),
            StillImage::Decoded(image) => Ok(image.clone()),
        }
    }
}

/// Pick a source for `path`: a directory of frames or a single image file.
pub fn open_frames(path: &Path) -> Result<Box<dyn FrameSource>, FrameError> {
    if path.is_dir() {
        Ok(Box::new(ImageSequence::from_dir(path)?))
    } else {
        Ok(Box::new(StillImage::File(path.to_path_buf())))
    }
}
