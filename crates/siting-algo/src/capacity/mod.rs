//! Capacity allocation over a fixed site set
//!
//! Given the sites that are currently selected, [`CapacityOptimizer`] finds the
//! split of a fixed total supply that makes the 2SFCA accessibility index as
//! even as possible across demand points.
//!
//! ## Formulation
//!
//! With decay weights `F` restricted to the selected columns, each site's supply
//! is first normalized by the demand inside its weighted catchment:
//!
//! ```text
//! g_j  = 1 / Σ_i d_i · F_ij
//! P    = F · diag(g)               (demand point × site contribution)
//! A_i  = Σ_j P_ij · x_j            (accessibility index)
//! ```
//!
//! The allocation minimizes the demand-weighted squared deviation of `A` from
//! the region average `Ā = S / Σ d`:
//!
//! ```text
//! minimize    ½ x'(P'DP + εI)x − (P'DĀ)'x
//! subject to  min ≤ x_j ≤ max,   Σ x_j = S
//! ```
//!
//! The problem is convex; `ε` only guards the Hessian against roundoff.
//!
//! ## Reference
//!
//! - **Li, Wang, Kwan, Chen & Wang (2022)**: "Equalizing the spatial accessibility
//!   of emergency medical services in Shanghai: A trade-off perspective"
//!   Computers, Environment and Urban Systems, 92, 101745.

mod metrics;
mod optimizer;
mod qp;

pub use metrics::{
    accessibility_metrics, coverage_percentage, rms_deviation, weighted_gini,
    AccessibilityMetrics,
};
pub use optimizer::{CapacityOptimizer, CapacitySolution};
pub use qp::QpSettings;

use thiserror::Error;

/// Why a single capacity solve produced no allocation.
///
/// These are expected outcomes during the greedy search (a candidate whose
/// catchment holds no demand simply cannot be evaluated) and are never
/// propagated as region errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveFailure {
    #[error("no sites to allocate over")]
    EmptySelection,

    #[error("demand vector has {found} entries, expected {expected}")]
    DemandMismatch { expected: usize, found: usize },

    #[error("allocation has {found} entries for {expected} sites")]
    AllocationMismatch { expected: usize, found: usize },

    #[error("site index {index} is out of range for {candidates} candidates")]
    SiteOutOfRange { index: usize, candidates: usize },

    /// The site's weighted catchment holds no demand, so its normalizing gain is undefined.
    #[error("candidate {site} has no demand inside its catchment")]
    EmptyCatchment { site: usize },

    #[error("QP data contains non-finite values")]
    NonFiniteModel,

    #[error("solver setup failed: {0}")]
    Setup(String),

    #[error("solver finished with status {0}")]
    Status(String),

    #[error("solver returned a non-finite allocation")]
    NonFiniteSolution,
}

/// Outcome of one capacity solve.
pub type CapacityOutcome = Result<CapacitySolution, SolveFailure>;
