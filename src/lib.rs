#![doc = include_str!("../README.md")]

// Query pipeline and its results.
pub mod diagnostics;
pub mod error;
pub mod locator;
pub mod types;

// Stages, usable on their own.
pub mod features;
pub mod hash;
pub mod homography;
pub mod index;
pub mod matching;
pub mod ranking;
pub mod verify;

// Inputs and tooling.
pub mod config;
pub mod frames;
pub mod image;

// --- High-level re-exports -------------------------------------------------

pub use crate::diagnostics::QueryReport;
pub use crate::error::{ExtractionError, LocateError};
pub use crate::index::{IndexBuild, IndexOptions, ReferenceIndex};
pub use crate::locator::{DocumentLocator, LocatorParams};
pub use crate::types::{Localization, NoMatchReason, QueryOutcome};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use doc_locator::prelude::*;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = HarrisPatchExtractor::new(HarrisParams::default());
/// let scans = vec![PathSource::new("scans/doc1.png"), PathSource::new("scans/doc2.png")];
/// let build = ReferenceIndex::build(&scans, &extractor, &IndexOptions::default());
///
/// let locator = DocumentLocator::new(LocatorParams::default(), extractor);
/// let frame = GrayImageU8::filled(640, 480, 128);
/// let report = locator.locate(&build.index, frame.as_view())?;
/// println!("{:?} in {:.3} ms", report.outcome.identified_id(), report.timing.total_ms);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::features::{FeatureExtractor, FeatureSet, HarrisParams, HarrisPatchExtractor};
    pub use crate::image::{GrayImageU8, ImageU8};
    pub use crate::index::{MemorySource, PathSource};
    pub use crate::{
        DocumentLocator, IndexOptions, LocatorParams, QueryOutcome, QueryReport, ReferenceIndex,
    };
}
