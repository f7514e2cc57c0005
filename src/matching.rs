//! Descriptor correspondences filtered by the nearest/second-nearest
//! distance ratio.
//!
//! For every query descriptor the two nearest candidate descriptors are
//! found; the nearest is accepted only when `d1 < ratio · d2`. The match
//! score of a candidate is the number of accepted correspondences.
use crate::features::FeatureSet;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default nearest/second-nearest distance ratio.
pub const DEFAULT_RATIO: f32 = 0.75;

/// Query descriptor `query_index` matched to candidate descriptor
/// `reference_index` at Euclidean distance `distance`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub query_index: usize,
    pub reference_index: usize,
    pub distance: f32,
}

/// The nearest candidate descriptor and, when the candidate set has more
/// than one descriptor, the distance of the runner-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbors {
    pub best_index: usize,
    pub best_distance: f32,
    pub second_distance: Option<f32>,
}

/// Nearest-neighbour search over one candidate's descriptors.
///
/// [`BruteForceL2`] is exact; an approximate index can be substituted as
/// long as it returns the same shape of answer.
pub trait NeighborSearch: Send + Sync {
    fn two_nearest(&self, query: &[f32], candidate: &FeatureSet) -> Option<Neighbors>;
}

/// Exhaustive Euclidean search. Equal distances resolve to the lower index.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForceL2;

#[inline]
fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

impl NeighborSearch for BruteForceL2 {
    fn two_nearest(&self, query: &[f32], candidate: &FeatureSet) -> Option<Neighbors> {
        let mut best: Option<(usize, f32)> = None;
        let mut second: Option<f32> = None;
        for (idx, (_, desc)) in candidate.iter().enumerate() {
            let d = l2(query, desc);
            match best {
                Some((_, bd)) if d >= bd => {
                    if second.map_or(true, |sd| d < sd) {
                        second = Some(d);
                    }
                }
                _ => {
                    second = best.map(|(_, bd)| bd);
                    best = Some((idx, d));
                }
            }
        }
        best.map(|(best_index, best_distance)| Neighbors {
            best_index,
            best_distance,
            second_distance: second,
        })
    }
}

/// `d1 < ratio · d2`: the best match is clearly better than the runner-up.
#[inline]
pub fn passes_ratio_test(d1: f32, d2: f32, ratio: f32) -> bool {
    d1 < ratio * d2
}

/// Accepted correspondences for one candidate and their count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchResult {
    pub correspondences: Vec<Correspondence>,
    pub score: usize,
}

/// Score of one shortlisted candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub id: String,
    pub score: usize,
}

pub struct CorrespondenceMatcher<S: NeighborSearch = BruteForceL2> {
    ratio: f32,
    search: S,
}

impl Default for CorrespondenceMatcher<BruteForceL2> {
    fn default() -> Self {
        Self::new(DEFAULT_RATIO)
    }
}

impl CorrespondenceMatcher<BruteForceL2> {
    pub fn new(ratio: f32) -> Self {
        Self {
            ratio,
            search: BruteForceL2,
        }
    }
}

impl<S: NeighborSearch> CorrespondenceMatcher<S> {
    pub fn with_search(ratio: f32, search: S) -> Self {
        Self { ratio, search }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    /// Ratio-filtered correspondences from `query` into `candidate`.
    ///
    /// Empty feature sets, mismatched descriptor dimensions and candidates
    /// with a single descriptor (no runner-up to compare against) all give
    /// a score of zero.
    pub fn match_features(&self, query: &FeatureSet, candidate: &FeatureSet) -> MatchResult {
        if query.is_empty() || candidate.is_empty() {
            return MatchResult::default();
        }
        if query.dim() != candidate.dim() {
            debug!(
                "CorrespondenceMatcher: descriptor dim mismatch query={} candidate={}",
                query.dim(),
                candidate.dim()
            );
            return MatchResult::default();
        }

        let mut correspondences = Vec::new();
        for (query_index, (_, desc)) in query.iter().enumerate() {
            let Some(nn) = self.search.two_nearest(desc, candidate) else {
                continue;
            };
            let Some(second) = nn.second_distance else {
                continue;
            };
            if passes_ratio_test(nn.best_distance, second, self.ratio) {
                correspondences.push(Correspondence {
                    query_index,
                    reference_index: nn.best_index,
                    distance: nn.best_distance,
                });
            }
        }
        let score = correspondences.len();
        MatchResult {
            correspondences,
            score,
        }
    }

    /// Score every candidate in parallel; the output keeps input order.
    pub fn score_all<'a, I>(&self, query: &FeatureSet, candidates: I) -> Vec<(String, MatchResult)>
    where
        I: IntoParallelIterator<Item = (&'a str, &'a FeatureSet)>,
    {
        candidates
            .into_par_iter()
            .map(|(id, features)| (id.to_string(), self.match_features(query, features)))
            .collect()
    }
}

/// Position of the highest score; the first candidate wins ties.
pub fn select_best(scores: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (pos, &score) in scores.iter().enumerate() {
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((pos, score));
        }
    }
    best.map(|(pos, _)| pos)
}
