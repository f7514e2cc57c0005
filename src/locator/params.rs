//! Parameter types configuring the query stages.
//!
//! Every field has a default, so a config file only needs to name the knobs
//! it changes.
use crate::hash::HashMetric;
use crate::matching::DEFAULT_RATIO;
use crate::ranking::DEFAULT_TOP_K;
use crate::verify::VerifyParams;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorParams {
    /// Shortlist length handed from fingerprint ranking to matching.
    pub top_k: usize,
    /// Fingerprint comparison used for ranking.
    pub metric: HashMetric,
    /// Nearest/second-nearest ratio for accepting a correspondence.
    pub ratio: f32,
    /// Best candidates scoring below this are reported as no match.
    pub min_score: usize,
    /// When set, the runner-up must score at most `ratio · best`, otherwise
    /// the identification is considered ambiguous.
    pub distinctness_ratio: Option<f32>,
    pub verify: VerifyParams,
}

impl Default for LocatorParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            metric: HashMetric::default(),
            ratio: DEFAULT_RATIO,
            min_score: 1,
            distinctness_ratio: None,
            verify: VerifyParams::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let params: LocatorParams =
            serde_json::from_str(r#"{"top_k": 5, "metric": "hamming", "verify": {"seed": null}}"#)
                .unwrap();
        assert_eq!(params.top_k, 5);
        assert_eq!(params.metric, HashMetric::Hamming);
        assert_eq!(params.ratio, DEFAULT_RATIO);
        assert_eq!(params.min_score, 1);
        assert_eq!(params.verify.min_matches, 10);
        assert_eq!(params.verify.seed, None);
    }
}
