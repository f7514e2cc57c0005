//! Query pipeline: fingerprint → shortlist → correspondences → verification.
//!
//! Typical usage:
//! ```no_run
//! use doc_locator::features::{HarrisParams, HarrisPatchExtractor};
//! use doc_locator::index::{IndexOptions, PathSource, ReferenceIndex};
//! use doc_locator::{DocumentLocator, LocatorParams};
//! use doc_locator::image::io::load_image;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let locator = DocumentLocator::new(
//!     LocatorParams::default(),
//!     HarrisPatchExtractor::new(HarrisParams::default()),
//! );
//! let sources = vec![PathSource::new("scans/doc1.png"), PathSource::new("scans/doc2.png")];
//! let build = ReferenceIndex::build(&sources, locator.extractor(), &IndexOptions::default());
//! let frame = load_image(Path::new("frame.png"))?;
//! let report = locator.locate(&build.index, frame.as_view())?;
//! if let Some(id) = report.outcome.identified_id() {
//!     println!("frame shows {id}");
//! }
//! # Ok(())
//! # }
//! ```
use super::params::LocatorParams;
use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{FrameDescriptor, QueryReport, TimingBreakdown};
use crate::error::LocateError;
use crate::features::{FeatureExtractor, FeatureSet};
use crate::hash::compute_hash;
use crate::image::ImageU8;
use crate::index::{ReferenceEntry, ReferenceIndex};
use crate::matching::{select_best, CandidateScore, CorrespondenceMatcher, MatchResult};
use crate::ranking::CandidateRanker;
use crate::types::{Localization, NoMatchReason, QueryOutcome};
use crate::verify::GeometricVerifier;
use log::debug;
use std::time::Instant;

/// Identifies the document shown in a frame and localizes the frame in it.
///
/// Holds no per-query state: `locate` takes `&self` and can be called from
/// several threads against the same index.
pub struct DocumentLocator<E: FeatureExtractor> {
    params: LocatorParams,
    extractor: E,
    ranker: CandidateRanker,
    matcher: CorrespondenceMatcher,
    verifier: GeometricVerifier,
}

impl<E: FeatureExtractor> DocumentLocator<E> {
    /// Create a locator; `extractor` must be the one the index was built with.
    pub fn new(params: LocatorParams, extractor: E) -> Self {
        let ranker = CandidateRanker::new(params.top_k, params.metric);
        let matcher = CorrespondenceMatcher::new(params.ratio);
        let verifier = GeometricVerifier::new(params.verify.clone());
        Self {
            params,
            extractor,
            ranker,
            matcher,
            verifier,
        }
    }

    pub fn params(&self) -> &LocatorParams {
        &self.params
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Run one query frame against `index`.
    pub fn locate(
        &self,
        index: &ReferenceIndex,
        frame: ImageU8<'_>,
    ) -> Result<QueryReport, LocateError> {
        debug!(
            "DocumentLocator::locate start w={} h={} references={} top_k={}",
            frame.w,
            frame.h,
            index.len(),
            self.params.top_k
        );
        if index.is_empty() {
            return Err(LocateError::EmptyDatabase);
        }
        let total_start = Instant::now();
        let mut timing = TimingBreakdown::default();

        let fingerprint = timing.record("hash", || compute_hash(frame))?;
        let query = timing.record("extract", || self.extractor.extract(frame))?;
        debug!(
            "DocumentLocator::locate fingerprint={} features={}",
            fingerprint,
            query.len()
        );

        let shortlist = timing.record("rank", || self.ranker.rank(fingerprint, index));
        let entries: Vec<&ReferenceEntry> = shortlist
            .iter()
            .filter_map(|c| index.get(&c.id))
            .collect();
        debug!(
            "DocumentLocator::locate shortlist={} best_distance={:?}",
            shortlist.len(),
            shortlist.first().map(|c| c.distance)
        );

        let results = timing.record("match", || {
            let candidates: Vec<(&str, &FeatureSet)> = entries
                .iter()
                .map(|e| (e.id.as_str(), &e.features))
                .collect();
            self.matcher.score_all(&query, candidates)
        });
        let scores: Vec<CandidateScore> = results
            .iter()
            .map(|(id, r)| CandidateScore {
                id: id.clone(),
                score: r.score,
            })
            .collect();

        let outcome = match self.select(&results) {
            Err(reason) => {
                debug!("DocumentLocator::locate no confident match: {}", reason);
                QueryOutcome::NoConfidentMatch { reason }
            }
            Ok(pos) => {
                let entry = entries[pos];
                let result = &results[pos].1;
                let localization = timing.record("verify", || {
                    self.localize(frame, &query, entry, result)
                });
                QueryOutcome::Identified {
                    id: entry.id.clone(),
                    score: result.score,
                    localization,
                }
            }
        };

        timing.finish(total_start);
        debug!(
            "DocumentLocator::locate done id={:?} total_ms={:.3}",
            outcome.identified_id(),
            timing.total_ms
        );
        Ok(QueryReport {
            outcome,
            frame: FrameDescriptor {
                width: frame.w,
                height: frame.h,
                feature_count: query.len(),
            },
            frame_fingerprint: fingerprint,
            shortlist,
            scores,
            timing,
        })
    }

    /// Shortlist position of the confidently best candidate.
    fn select(&self, results: &[(String, MatchResult)]) -> Result<usize, NoMatchReason> {
        let values: Vec<usize> = results.iter().map(|(_, r)| r.score).collect();
        let pos = select_best(&values).ok_or(NoMatchReason::NoCandidates)?;
        let best = values[pos];
        if best < self.params.min_score {
            return Err(NoMatchReason::BelowMinScore {
                best,
                min_score: self.params.min_score,
            });
        }
        if let Some(ratio) = self.params.distinctness_ratio {
            let runner_up = values
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != pos)
                .map(|(_, &s)| s)
                .max()
                .unwrap_or(0);
            if runner_up as f32 > ratio * best as f32 {
                return Err(NoMatchReason::NotDistinct { best, runner_up });
            }
        }
        Ok(pos)
    }

    fn localize(
        &self,
        frame: ImageU8<'_>,
        query: &FeatureSet,
        entry: &ReferenceEntry,
        result: &MatchResult,
    ) -> Localization {
        let start = Instant::now();
        let outcome = self.verifier.localize(
            &result.correspondences,
            query,
            &entry.features,
            frame.w,
            frame.h,
        );
        debug!(
            "DocumentLocator::locate verify id={} correspondences={} ok={} elapsed_ms={:.3}",
            entry.id,
            result.correspondences.len(),
            outcome.is_ok(),
            elapsed_ms(start)
        );
        match outcome {
            Ok(localized) => Localization::Located {
                transform: localized.transform,
                quad: localized.quad,
            },
            Err(reason) => Localization::Withheld { reason },
        }
    }
}
