//! Document locator orchestrating the query pipeline.
//!
//! Overview
//! - Fingerprints the query frame and ranks every indexed document by
//!   fingerprint distance; only the shortlist reaches descriptor matching.
//! - Extracts the frame's features once and scores each shortlisted
//!   candidate by ratio-tested correspondences (candidates run in parallel).
//! - Picks the highest score (first in shortlist order on ties) and, if it
//!   is confident, fits a homography to its correspondences and projects the
//!   frame outline into the document.
//!
//! Modules
//! - [`params`]: configuration used by the locator and the CLI.
//! - `pipeline`: the [`DocumentLocator`] implementation.
//!
//! Outcomes
//! - An empty index or an unprocessable frame is a [`LocateError`](crate::error::LocateError).
//! - "No confident match" and a withheld localization are regular
//!   [`QueryOutcome`](crate::types::QueryOutcome)s.

pub mod params;
mod pipeline;

pub use params::LocatorParams;
pub use pipeline::DocumentLocator;
