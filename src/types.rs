use crate::verify::{Quad, Rejection, Transform};
use serde::Serialize;
use std::fmt;

/// Why a query produced no identification.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum NoMatchReason {
    /// The shortlist was empty (`top_k == 0`).
    NoCandidates,
    /// The best candidate's score did not reach `min_score`.
    BelowMinScore { best: usize, min_score: usize },
    /// The runner-up scored too close to the best candidate.
    NotDistinct { best: usize, runner_up: usize },
}

impl fmt::Display for NoMatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoMatchReason::NoCandidates => f.write_str("no candidates"),
            NoMatchReason::BelowMinScore { best, min_score } => {
                write!(f, "best score {best} below minimum {min_score}")
            }
            NoMatchReason::NotDistinct { best, runner_up } => {
                write!(f, "best score {best} not distinct from runner-up {runner_up}")
            }
        }
    }
}

/// Localization of an identified document.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum Localization {
    Located { transform: Transform, quad: Quad },
    Withheld { reason: Rejection },
}

impl Localization {
    pub fn quad(&self) -> Option<&Quad> {
        match self {
            Localization::Located { quad, .. } => Some(quad),
            Localization::Withheld { .. } => None,
        }
    }
}

/// Final answer of one query.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum QueryOutcome {
    NoConfidentMatch {
        reason: NoMatchReason,
    },
    Identified {
        id: String,
        score: usize,
        localization: Localization,
    },
}

impl QueryOutcome {
    /// Id of the identified document, if any.
    pub fn identified_id(&self) -> Option<&str> {
        match self {
            QueryOutcome::Identified { id, .. } => Some(id),
            QueryOutcome::NoConfidentMatch { .. } => None,
        }
    }

    pub fn quad(&self) -> Option<&Quad> {
        match self {
            QueryOutcome::Identified { localization, .. } => localization.quad(),
            QueryOutcome::NoConfidentMatch { .. } => None,
        }
    }
}
