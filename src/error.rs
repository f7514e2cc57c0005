//! Error types shared across the indexing and query stages.
//!
//! Outcomes that are part of normal operation ("no confident match",
//! "insufficient correspondences") are not errors; they live in
//! [`crate::types::QueryOutcome`] and [`crate::verify::Rejection`].
use std::io;
use std::path::PathBuf;

/// Failure to turn an image into a fingerprint or a feature set.
///
/// Recoverable while building the index (the image is skipped), fatal for
/// the query frame.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("image has zero area ({width}x{height})")]
    EmptyImage { width: usize, height: usize },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("feature extractor failed: {0}")]
    Extractor(String),

    #[error("invalid feature set: {0}")]
    InvalidFeatures(String),

    #[error("image view is malformed ({width}x{height}, stride {stride}, {len} bytes)")]
    MalformedView {
        width: usize,
        height: usize,
        stride: usize,
        len: usize,
    },
}

/// Why a source was left out of the index.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("duplicate reference id")]
    DuplicateId,
}

/// Failures that stop a query before any candidate is scored.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("reference index is empty")]
    EmptyDatabase,

    #[error("query frame could not be processed: {0}")]
    QueryExtraction(#[from] ExtractionError),
}

/// Errors raised while saving or loading an index snapshot.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed index snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate reference id `{0}`")]
    DuplicateId(String),

    #[error("unsupported snapshot version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// Errors from a query frame source.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame source has no frames")]
    NoFrames,

    #[error("frame {index} out of range (source has {count})")]
    OutOfRange { index: usize, count: usize },

    #[error("failed to read frame: {0}")]
    Read(#[from] ExtractionError),
}

/// Errors while loading a tool configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
