//! Greedy site selection
//!
//! Starting from the mandatory initial sites, the selector adds one candidate
//! per step: every remaining candidate is evaluated by re-optimizing the
//! capacity of the whole selection plus that candidate, and the candidate
//! with the lowest `A_hat` is kept.
//!
//! ```text
//! ┌──────────────┐   initial == target   ┌────────────────┐
//! │ INITIALIZING │──────────────────────▶│                │
//! └──────┬───────┘                       │                │
//!        │ even supply split             │                │
//!        ▼                               │                │
//! ┌──────────────┐   |selected| == target│   FINALIZING   │
//! │  SELECTING   │──────────────────────▶│                │
//! │  (one step)  │                       │                │
//! └──────┬───────┘   no candidate solved │                │
//!        └──────────────────────────────▶│                │
//!                                        └────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Within one step, evaluations are independent and may run on any
//! [`CandidateDispatcher`]. The reduction is always a sequential pass over
//! results in ascending candidate order, so the selection does not depend on
//! the dispatcher or the thread count.
//!
//! ## Persistence
//!
//! Each accepted step is handed to a [`SnapshotWriter`]; [`NoSnapshots`] turns
//! this off.

mod dispatch;
mod record;
mod selector;
mod snapshot;

#[cfg(feature = "parallel")]
pub use dispatch::RayonDispatcher;
pub use dispatch::{select_best, CandidateDispatcher, CandidateEvaluation, SequentialDispatcher};
pub use record::{SelectionOutcome, SiteAllocation, StepRecord, Termination};
pub use selector::{GreedySelector, SelectionState};
pub use snapshot::{
    MemorySnapshots, NoSnapshots, OwnedSnapshot, SnapshotError, SnapshotWriter, StepSnapshot,
};
