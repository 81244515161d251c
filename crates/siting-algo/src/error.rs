//! Error types for region configuration and the selection loop.

use crate::greedy::SnapshotError;
use thiserror::Error;

/// Errors that abort the processing of a single region.
///
/// Per-candidate solver failures are *not* represented here: those are
/// [`SolveFailure`](crate::capacity::SolveFailure) values absorbed by the
/// greedy loop.
#[derive(Debug, Error)]
pub enum SitingError {
    /// None of the mandatory initial sites could be resolved.
    #[error("region {region}: no initial sites selected (at least one is required to seed the supply split)")]
    NoInitialSites { region: String },

    /// An initial site index does not address a candidate column.
    #[error("region {region}: initial site index {index} is out of range for {candidates} candidates")]
    InitialSiteOutOfRange {
        region: String,
        index: usize,
        candidates: usize,
    },

    /// Demand sums to zero (or is not finite), so the average accessibility is undefined.
    #[error("region {region}: total demand must be positive and finite, got {total}")]
    InvalidTotalDemand { region: String, total: f64 },

    /// A scalar parameter is outside its admissible range.
    #[error("region {region}: {name} must be {expected}, got {value}")]
    InvalidParameter {
        region: String,
        name: &'static str,
        expected: &'static str,
        value: f64,
    },

    /// Two inputs that must align do not.
    #[error("region {region}: {what} has length {found}, expected {expected}")]
    LengthMismatch {
        region: String,
        what: String,
        expected: usize,
        found: usize,
    },

    /// A demand value or distance is negative or not finite.
    #[error("region {region}: {what} contains an invalid value {value} at {position}")]
    InvalidValue {
        region: String,
        what: &'static str,
        position: String,
        value: f64,
    },

    /// Candidate identifiers must be unique.
    #[error("region {region}: duplicate candidate id {id}")]
    DuplicateCandidate { region: String, id: String },

    /// Lower capacity bound exceeds the upper bound.
    #[error("region {region}: capacity bounds are inverted (min {min} > max {max})")]
    InvertedBounds { region: String, min: f64, max: f64 },

    /// Target count cannot be reached or is below the mandatory set.
    #[error("region {region}: target site count {target} must lie in [{initial}, {candidates}]")]
    InvalidTarget {
        region: String,
        target: usize,
        initial: usize,
        candidates: usize,
    },

    /// A step snapshot could not be persisted.
    #[error("region {region}: failed to persist snapshot for step {step}: {source}")]
    Snapshot {
        region: String,
        step: usize,
        #[source]
        source: SnapshotError,
    },
}

/// Result type alias for region-level operations.
pub type SitingResult<T> = Result<T, SitingError>;
