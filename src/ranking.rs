//! Fingerprint shortlist: a cheap pre-filter bounding how many documents
//! reach descriptor matching.
use crate::hash::{Fingerprint, HashMetric};
use crate::index::ReferenceIndex;
use serde::{Deserialize, Serialize};

/// Default shortlist length.
pub const DEFAULT_TOP_K: usize = 30;

/// Shortlisted document and its fingerprint distance to the query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub distance: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct CandidateRanker {
    pub top_k: usize,
    pub metric: HashMetric,
}

impl Default for CandidateRanker {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            metric: HashMetric::default(),
        }
    }
}

impl CandidateRanker {
    pub fn new(top_k: usize, metric: HashMetric) -> Self {
        Self { top_k, metric }
    }

    /// Up to `top_k` entries by ascending distance; equal distances keep
    /// index insertion order.
    pub fn rank(&self, query: Fingerprint, index: &ReferenceIndex) -> Vec<Candidate> {
        let mut scored: Vec<(usize, u64)> = index
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, self.metric.distance(query, entry.fingerprint)))
            .collect();
        scored.sort_by_key(|&(_, d)| d);
        scored.truncate(self.top_k);
        scored
            .into_iter()
            .map(|(pos, distance)| Candidate {
                id: index.all()[pos].id.clone(),
                distance,
            })
            .collect()
    }
}
