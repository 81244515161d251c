//! Per-step snapshot persistence.
//!
//! The selector does not know where snapshots go; it hands each accepted step
//! to a [`SnapshotWriter`] supplied by the caller.

use thiserror::Error;

/// Errors raised by snapshot writers.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Raw vectors of one accepted step.
#[derive(Debug, Clone, Copy)]
pub struct StepSnapshot<'a> {
    pub region_id: &'a str,
    pub step: usize,
    /// Supply per candidate column (zero for unselected candidates)
    pub supply: &'a [f64],
    /// Accessibility index per demand point
    pub accessibility: &'a [f64],
}

/// Capability to persist a step snapshot.
pub trait SnapshotWriter {
    fn write_snapshot(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), SnapshotError>;
}

impl<W: SnapshotWriter + ?Sized> SnapshotWriter for &mut W {
    fn write_snapshot(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), SnapshotError> {
        (**self).write_snapshot(snapshot)
    }
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSnapshots;

impl SnapshotWriter for NoSnapshots {
    fn write_snapshot(&mut self, _snapshot: &StepSnapshot<'_>) -> Result<(), SnapshotError> {
        Ok(())
    }
}

/// Owned copy of a [`StepSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedSnapshot {
    pub step: usize,
    pub supply: Vec<f64>,
    pub accessibility: Vec<f64>,
}

/// Keeps snapshots in memory, keyed by step in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshots {
    pub snapshots: Vec<OwnedSnapshot>,
}

impl SnapshotWriter for MemorySnapshots {
    fn write_snapshot(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), SnapshotError> {
        self.snapshots.push(OwnedSnapshot {
            step: snapshot.step,
            supply: snapshot.supply.to_vec(),
            accessibility: snapshot.accessibility.to_vec(),
        });
        Ok(())
    }
}
