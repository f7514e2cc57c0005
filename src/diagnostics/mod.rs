//! Per-query report returned by [`DocumentLocator::locate`](crate::DocumentLocator).
//!
//! `QueryReport` bundles the final [`QueryOutcome`] with the intermediate
//! results that led to it: the query fingerprint, the fingerprint shortlist,
//! the correspondence score of every shortlisted candidate and the stage
//! timings. The whole report serializes to JSON for tooling.

pub mod overlay;
pub mod timing;

pub use overlay::render_overlay;
pub use timing::{StageTiming, TimingBreakdown};

use crate::hash::Fingerprint;
use crate::matching::CandidateScore;
use crate::ranking::Candidate;
use crate::types::{Localization, QueryOutcome};
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDescriptor {
    pub width: usize,
    pub height: usize,
    pub feature_count: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    pub outcome: QueryOutcome,
    pub frame: FrameDescriptor,
    pub frame_fingerprint: Fingerprint,
    pub shortlist: Vec<Candidate>,
    /// Correspondence scores in shortlist order.
    pub scores: Vec<CandidateScore>,
    pub timing: TimingBreakdown,
}

impl QueryReport {
    /// Human readable lines for console output.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "frame {}x{} fingerprint={} features={}",
            self.frame.width, self.frame.height, self.frame_fingerprint, self.frame.feature_count
        )];
        match &self.outcome {
            QueryOutcome::NoConfidentMatch { reason } => {
                lines.push(format!("no confident match: {reason}"));
            }
            QueryOutcome::Identified {
                id,
                score,
                localization,
            } => {
                lines.push(format!("identified {id} (score {score})"));
                match localization {
                    Localization::Located { transform, quad } => {
                        lines.push(format!("inliers: {}", transform.inliers.len()));
                        let corners: Vec<String> = quad
                            .0
                            .iter()
                            .map(|p| format!("({:.1}, {:.1})", p[0], p[1]))
                            .collect();
                        lines.push(format!("quad: {}", corners.join(" ")));
                    }
                    Localization::Withheld { reason } => {
                        lines.push(format!("localization withheld: {reason}"));
                    }
                }
            }
        }
        let stages: Vec<String> = self
            .timing
            .stages
            .iter()
            .map(|s| format!("{}={:.2}ms", s.label, s.elapsed_ms))
            .collect();
        lines.push(format!(
            "timing total={:.2}ms {}",
            self.timing.total_ms,
            stages.join(" ")
        ));
        lines
    }
}
