//! # siting-algo: Equitable Facility Siting
//!
//! This crate selects facility sites for a region and allocates a fixed total
//! capacity across them so that spatial accessibility, measured by the
//! two-step floating catchment area (2SFCA) index, is as equal as possible.
//!
//! ## Pipeline
//!
//! | Stage | Item | Description |
//! |-------|------|-------------|
//! | Input | [`RegionSessionBuilder`] | Validated, immutable region data |
//! | Decay | [`decay::gaussian_decay`] | Bounded Gaussian distance weights |
//! | Allocation | [`CapacityOptimizer`] | Convex QP over the selected sites (Clarabel) |
//! | Selection | [`GreedySelector`] | Adds the candidate that lowers `A_hat` the most |
//!
//! ## Metrics
//!
//! Each accepted step reports `A_hat` (demand-weighted RMS deviation from the
//! regional average), the accessibility extremes, MD, MAD, CV, a
//! demand-weighted Gini coefficient, and the share of demand covered.
//!
//! ## Example
//!
//! ```ignore
//! use siting_algo::{GreedySelector, NoSnapshots, RegionSessionBuilder, SequentialDispatcher};
//!
//! let session = RegionSessionBuilder::new("tract-12")
//!     .total_supply(40.0)
//!     .demand_values(demand)
//!     .distance_rows(distances)
//!     .candidate_ids(ids)
//!     .initial_site_ids(["hospital-1"])
//!     .target_site_count(6)
//!     .build()?;
//!
//! let outcome = GreedySelector::new(&session, SequentialDispatcher, NoSnapshots)?.run()?;
//! println!("{}", outcome.summary());
//! ```

pub mod capacity;
pub mod decay;
pub mod error;
pub mod greedy;
pub mod session;

pub use capacity::{
    AccessibilityMetrics, CapacityOptimizer, CapacityOutcome, CapacitySolution, QpSettings,
    SolveFailure,
};
pub use error::{SitingError, SitingResult};
#[cfg(feature = "parallel")]
pub use greedy::RayonDispatcher;
pub use greedy::{
    CandidateDispatcher, GreedySelector, MemorySnapshots, NoSnapshots, SelectionOutcome,
    SequentialDispatcher, SiteAllocation, SnapshotError, SnapshotWriter, StepRecord, StepSnapshot,
    Termination,
};
pub use session::{CapacityBounds, RegionSession, RegionSessionBuilder};
