//! Reference index: one immutable entry per scanned document.
//!
//! The index is built once (per-image work runs in parallel) and is
//! read-only afterwards, so queries can share it across threads without
//! locking. Entries keep their input order, which is also the tie-break
//! order of the candidate ranking.
use crate::error::{ExtractionError, PersistError, SkipReason};
use crate::features::{FeatureExtractor, FeatureSet};
use crate::hash::{compute_hash, Fingerprint};
use crate::image::io::load_image;
use crate::image::GrayImageU8;
use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Snapshot format version written by [`ReferenceIndex::save_json`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// A document image that can be loaded on demand.
pub trait ImageSource: Sync {
    /// Stable identifier, e.g. the file name.
    fn id(&self) -> &str;
    fn load(&self) -> Result<GrayImageU8, ExtractionError>;
}

impl<T: ImageSource + ?Sized> ImageSource for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }
    fn load(&self) -> Result<GrayImageU8, ExtractionError> {
        (**self).load()
    }
}

/// Image file identified by its file name.
#[derive(Clone, Debug)]
pub struct PathSource {
    id: String,
    path: PathBuf,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { id, path }
    }

    pub fn with_id(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for PathSource {
    fn id(&self) -> &str {
        &self.id
    }
    fn load(&self) -> Result<GrayImageU8, ExtractionError> {
        load_image(&self.path)
    }
}

/// Already decoded image.
#[derive(Clone, Debug)]
pub struct MemorySource {
    id: String,
    image: GrayImageU8,
}

impl MemorySource {
    pub fn new(id: impl Into<String>, image: GrayImageU8) -> Self {
        Self {
            id: id.into(),
            image,
        }
    }
}

impl ImageSource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }
    fn load(&self) -> Result<GrayImageU8, ExtractionError> {
        Ok(self.image.clone())
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Keep the decoded pixels in each entry, e.g. to draw an overlay on the
    /// matched document without reloading it.
    pub retain_images: bool,
}

/// Indexed document. The fingerprint and features are always derived from
/// the image the entry was built from.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub id: String,
    pub width: usize,
    pub height: usize,
    pub fingerprint: Fingerprint,
    pub features: FeatureSet,
    #[serde(skip)]
    pub image: Option<GrayImageU8>,
}

/// An image skipped while building the index.
#[derive(Debug)]
pub struct BuildWarning {
    pub id: String,
    pub reason: SkipReason,
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}: {}", self.id, self.reason)
    }
}

/// Result of [`ReferenceIndex::build`]: the index plus per-image warnings.
#[derive(Debug)]
pub struct IndexBuild {
    pub index: ReferenceIndex,
    pub warnings: Vec<BuildWarning>,
    pub elapsed_ms: f64,
}

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    version: u32,
    entries: Vec<ReferenceEntry>,
}

/// Immutable mapping `id → ReferenceEntry` preserving insertion order.
#[derive(Clone, Debug, Default)]
pub struct ReferenceIndex {
    entries: Vec<ReferenceEntry>,
    by_id: HashMap<String, usize>,
}

impl ReferenceIndex {
    /// Fingerprint and extract features for every source.
    ///
    /// Sources that fail to load, hash or extract are skipped and reported
    /// as warnings; a later source repeating an earlier id is skipped too.
    /// Sources whose extraction yields no features are still indexed.
    pub fn build<S: ImageSource>(
        sources: &[S],
        extractor: &dyn FeatureExtractor,
        options: &IndexOptions,
    ) -> IndexBuild {
        let start = Instant::now();
        let results: Vec<Result<ReferenceEntry, ExtractionError>> = sources
            .par_iter()
            .map(|source| index_one(source, extractor, options))
            .collect();

        let mut index = ReferenceIndex::default();
        let mut warnings = Vec::new();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(entry) => {
                    if index.by_id.contains_key(&entry.id) {
                        let warning = BuildWarning {
                            id: entry.id.clone(),
                            reason: SkipReason::DuplicateId,
                        };
                        warn!("{warning}");
                        warnings.push(warning);
                        continue;
                    }
                    index.insert(entry);
                }
                Err(error) => {
                    let warning = BuildWarning {
                        id: source.id().to_string(),
                        reason: error.into(),
                    };
                    warn!("{warning}");
                    warnings.push(warning);
                }
            }
        }
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "ReferenceIndex::build indexed={} skipped={} elapsed_ms={:.3}",
            index.len(),
            warnings.len(),
            elapsed_ms
        );
        IndexBuild {
            index,
            warnings,
            elapsed_ms,
        }
    }

    /// Assemble an index from prepared entries, rejecting duplicate ids.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Result<Self, PersistError> {
        let mut index = ReferenceIndex::default();
        for entry in entries {
            if index.by_id.contains_key(&entry.id) {
                return Err(PersistError::DuplicateId(entry.id));
            }
            index.insert(entry);
        }
        Ok(index)
    }

    fn insert(&mut self, entry: ReferenceEntry) {
        self.by_id.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// All entries in insertion order.
    pub fn all(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `{id, fingerprint, features, width, height}` for every entry.
    /// Pixels are never persisted.
    pub fn save_json(&self, path: &Path) -> Result<(), PersistError> {
        let snapshot = IndexSnapshot {
            version: SNAPSHOT_VERSION,
            entries: self.entries.clone(),
        };
        let io_err = |source: std::io::Error| PersistError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_vec(&snapshot).map_err(|source| PersistError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn load_json(path: &Path) -> Result<Self, PersistError> {
        let bytes = fs::read(path).map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: IndexSnapshot =
            serde_json::from_slice(&bytes).map_err(|source| PersistError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(PersistError::Version {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        Self::from_entries(snapshot.entries)
    }
}

fn index_one<S: ImageSource>(
    source: &S,
    extractor: &dyn FeatureExtractor,
    options: &IndexOptions,
) -> Result<ReferenceEntry, ExtractionError> {
    let image = source.load()?;
    let view = image.as_view();
    let fingerprint = compute_hash(view)?;
    let features = extractor.extract(view)?;
    if features.is_empty() {
        debug!("ReferenceIndex::build {} has no features", source.id());
    }
    Ok(ReferenceEntry {
        id: source.id().to_string(),
        width: image.width(),
        height: image.height(),
        fingerprint,
        features,
        image: options.retain_images.then_some(image),
    })
}
