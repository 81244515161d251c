//! Greedy selection loop.

use super::dispatch::{select_best, CandidateDispatcher};
use super::record::{SelectionOutcome, SiteAllocation, StepRecord, Termination};
use super::snapshot::{SnapshotWriter, StepSnapshot};
use crate::capacity::CapacityOptimizer;
use crate::error::{SitingError, SitingResult};
use crate::session::RegionSession;
use tracing::{debug, info, warn};

/// Mutable state owned by the outer loop.
#[derive(Debug, Clone)]
pub struct SelectionState {
    selected: Vec<usize>,
    remaining: Vec<usize>,
    supply: Vec<f64>,
    accessibility: Option<Vec<f64>>,
}

impl SelectionState {
    /// Selected candidate columns, initial sites first.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    /// Untried candidate columns in ascending order.
    pub fn remaining(&self) -> &[usize] {
        &self.remaining
    }

    /// Capacity per candidate column; zero for candidates not selected.
    pub fn supply(&self) -> &[f64] {
        &self.supply
    }

    /// Accessibility index of the current selection, when it could be evaluated.
    pub fn accessibility(&self) -> Option<&[f64]> {
        self.accessibility.as_deref()
    }
}

/// Greedy site selector for one region.
///
/// Construction performs the initialization (even split of the supply over
/// the mandatory sites); [`step`](Self::step) runs one selection round and
/// [`run`](Self::run) drives the loop to termination and returns the outcome.
pub struct GreedySelector<'s, D, W> {
    session: &'s RegionSession,
    optimizer: CapacityOptimizer,
    dispatcher: D,
    writer: W,
    state: SelectionState,
    steps: Vec<StepRecord>,
    termination: Option<Termination>,
}

impl<'s, D, W> GreedySelector<'s, D, W>
where
    D: CandidateDispatcher,
    W: SnapshotWriter,
{
    pub fn new(session: &'s RegionSession, dispatcher: D, writer: W) -> SitingResult<Self> {
        let optimizer = CapacityOptimizer::from_session(session);
        Self::with_optimizer(session, optimizer, dispatcher, writer)
    }

    /// Use a pre-built optimizer (e.g. with custom QP settings).
    pub fn with_optimizer(
        session: &'s RegionSession,
        optimizer: CapacityOptimizer,
        dispatcher: D,
        writer: W,
    ) -> SitingResult<Self> {
        let region = session.region_id();
        let initial = session.initial_site_indices().to_vec();
        if initial.is_empty() {
            return Err(SitingError::NoInitialSites {
                region: region.to_string(),
            });
        }

        let n = session.num_candidates();
        let share = session.total_supply() / initial.len() as f64;
        let mut supply = vec![0.0; n];
        for &site in &initial {
            supply[site] = share;
        }
        let remaining: Vec<usize> = (0..n).filter(|c| !initial.contains(c)).collect();

        let demand = session.demand_values();
        let initial_supply = vec![share; initial.len()];
        let accessibility = match optimizer.accessibility_for(&initial, &initial_supply, demand) {
            Ok(ai) => Some(ai),
            Err(failure) => {
                debug!(region, %failure, "initial selection cannot be evaluated");
                None
            }
        };

        let coverage = optimizer.calculate_coverage(&initial, session.distance_matrix(), demand);
        info!(
            region,
            total_supply = session.total_supply(),
            a_bar = optimizer.a_bar(),
            initial_sites = initial.len(),
            candidates = n,
            target = session.target_site_count(),
            initial_a_hat = ?accessibility.as_ref().map(|ai| optimizer.rms_deviation(ai, demand)),
            coverage,
            "processed region"
        );

        let mut selector = Self {
            session,
            optimizer,
            dispatcher,
            writer,
            state: SelectionState {
                selected: initial,
                remaining,
                supply,
                accessibility,
            },
            steps: Vec::new(),
            termination: None,
        };
        selector.check_target();
        Ok(selector)
    }

    pub fn session(&self) -> &RegionSession {
        self.session
    }

    pub fn optimizer(&self) -> &CapacityOptimizer {
        &self.optimizer
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// `None` while the loop is still selecting.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Run one selection round.
    ///
    /// Returns the accepted step, or `None` once the loop has terminated
    /// (target reached, or no remaining candidate could be solved).
    pub fn step(&mut self) -> SitingResult<Option<&StepRecord>> {
        if self.termination.is_some() {
            return Ok(None);
        }

        let region = self.session.region_id();
        let step = self.state.selected.len() + 1;
        let target = self.session.target_site_count();
        let demand = self.session.demand_values();
        let bounds = self.session.bounds();

        let optimizer = &self.optimizer;
        let selected = &self.state.selected;
        let evaluations = self.dispatcher.dispatch(&self.state.remaining, |candidate| {
            let mut sites = Vec::with_capacity(selected.len() + 1);
            sites.extend_from_slice(selected);
            sites.push(candidate);
            optimizer.optimize_capacity(&sites, demand, bounds)
        });

        let failed = evaluations.iter().filter(|e| !e.is_solved()).count();
        debug!(
            region,
            step,
            evaluated = evaluations.len(),
            failed,
            dispatcher = self.dispatcher.name(),
            "evaluated candidates"
        );

        let Some((candidate, solution)) = select_best(evaluations) else {
            warn!(
                region,
                step,
                "no remaining candidate yields a feasible allocation; terminating early"
            );
            self.termination = Some(Termination::Infeasible { step });
            return Ok(None);
        };

        // full re-optimization: every selected site takes the new allocation
        let mut supply = self.state.supply.clone();
        for (&site, &capacity) in solution.site_indices.iter().zip(&solution.allocation) {
            supply[site] = capacity;
        }

        let metrics = self
            .optimizer
            .calculate_metrics(&solution.accessibility, demand);
        let coverage = self.optimizer.calculate_coverage(
            &solution.site_indices,
            self.session.distance_matrix(),
            demand,
        );
        let site_id = self.session.candidate_id(candidate);

        info!(
            region,
            "Selecting site {:2}/{:2} | Selected Site: {} | A_hat: {:.5} | Coverage: {:6.2}%",
            step,
            target,
            site_id,
            metrics.a_hat,
            coverage
        );

        // state only changes once the snapshot is persisted
        self.writer
            .write_snapshot(&StepSnapshot {
                region_id: region,
                step,
                supply: &supply,
                accessibility: &solution.accessibility,
            })
            .map_err(|source| SitingError::Snapshot {
                region: region.to_string(),
                step,
                source,
            })?;

        self.state.selected.push(candidate);
        self.state.remaining.retain(|&c| c != candidate);
        self.state.supply = supply;
        self.state.accessibility = Some(solution.accessibility);
        self.steps.push(StepRecord {
            step,
            candidate_index: candidate,
            selected_site: site_id.to_string(),
            metrics,
            coverage,
        });
        self.check_target();

        Ok(self.steps.last())
    }

    /// Drive the loop to termination and produce the final tables.
    pub fn run(mut self) -> SitingResult<SelectionOutcome> {
        while self.step()?.is_some() {}
        Ok(self.finalize())
    }

    fn check_target(&mut self) {
        if self.termination.is_none()
            && self.state.selected.len() >= self.session.target_site_count()
        {
            self.termination = Some(Termination::TargetReached);
        }
    }

    fn finalize(self) -> SelectionOutcome {
        let session = self.session;
        let demand = session.demand_values();
        let termination = self.termination.unwrap_or(Termination::TargetReached);

        let allocations: Vec<SiteAllocation> = self
            .state
            .selected
            .iter()
            .map(|&site| SiteAllocation {
                candidate_index: site,
                candidate_id: session.candidate_id(site).to_string(),
                allocated_capacity: self.state.supply[site],
            })
            .collect();

        let final_a_hat = self
            .state
            .accessibility
            .as_ref()
            .map(|ai| self.optimizer.rms_deviation(ai, demand));
        let coverage = self.optimizer.calculate_coverage(
            &self.state.selected,
            session.distance_matrix(),
            demand,
        );

        if let Termination::Infeasible { step } = termination {
            info!(
                region = session.region_id(),
                selected = allocations.len(),
                target = session.target_site_count(),
                stopped_at = step,
                "optimization ended with a partial selection"
            );
        } else {
            info!(region = session.region_id(), "optimization complete");
        }

        SelectionOutcome {
            region_id: session.region_id().to_string(),
            termination,
            target_site_count: session.target_site_count(),
            initial_count: session.initial_site_indices().len(),
            steps: self.steps,
            allocations,
            accessibility: self.state.accessibility,
            final_a_hat,
            coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greedy::{MemorySnapshots, NoSnapshots, SequentialDispatcher, SnapshotError};
    use crate::session::RegionSessionBuilder;

    /// Demand clusters at x=0 and x=10; candidates on the same line.
    fn line_session(candidate_x: &[f64], target: usize) -> RegionSession {
        let demand_x = [0.0, 0.0, 0.0, 10.0, 10.0, 10.0];
        let rows = demand_x
            .iter()
            .map(|d| candidate_x.iter().map(|c| (d - c).abs()).collect())
            .collect();
        RegionSessionBuilder::new("line")
            .total_supply(12.0)
            .demand_values(vec![1.0; 6])
            .distance_rows(rows)
            .candidate_ids((0..candidate_x.len()).map(|i| format!("c{i}")))
            .initial_site_indices([0])
            .bandwidth(2.0)
            .capture_range(5.0)
            .target_site_count(target)
            .build()
            .unwrap()
    }

    #[test]
    fn test_initialization_splits_supply_evenly() {
        let session = RegionSessionBuilder::new("init")
            .total_supply(9.0)
            .demand_values(vec![1.0, 1.0])
            .distance_rows(vec![vec![0.0, 0.0, 0.0, 1.0], vec![0.0, 0.0, 0.0, 1.0]])
            .candidate_ids(["a", "b", "c", "d"])
            .initial_site_indices([2, 0, 1])
            .target_site_count(4)
            .build()
            .unwrap();
        let selector = GreedySelector::new(&session, SequentialDispatcher, NoSnapshots).unwrap();
        let state = selector.state();
        assert_eq!(state.selected(), &[2, 0, 1]);
        assert_eq!(state.remaining(), &[3]);
        assert_eq!(state.supply(), &[3.0, 3.0, 3.0, 0.0]);
        assert!(state.accessibility().is_some());
        assert!(selector.termination().is_none());
    }

    #[test]
    fn test_step_picks_uncovered_cluster_first() {
        let session = line_session(&[0.0, 0.5, 10.0, 100.0], 3);
        let mut selector = GreedySelector::new(&session, SequentialDispatcher, NoSnapshots).unwrap();

        let record = selector.step().unwrap().cloned().expect("first step accepted");
        assert_eq!(record.step, 2);
        assert_eq!(record.selected_site, "c2");
        assert!(record.a_hat() < 1e-3);
        assert!((record.coverage - 100.0).abs() < 1e-9);

        assert_eq!(selector.state().selected(), &[0, 2]);
        assert_eq!(selector.state().remaining(), &[1, 3]);
        let total: f64 = selector.state().supply().iter().sum();
        assert!((total - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_snapshots_are_written_per_step() {
        let session = line_session(&[0.0, 0.5, 10.0, 100.0], 3);
        let mut memory = MemorySnapshots::default();
        let outcome = GreedySelector::new(&session, SequentialDispatcher, &mut memory)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(outcome.steps.len(), 2);
        let steps: Vec<usize> = memory.snapshots.iter().map(|s| s.step).collect();
        assert_eq!(steps, vec![2, 3]);
        assert_eq!(memory.snapshots[0].supply.len(), 4);
        assert_eq!(memory.snapshots[0].accessibility.len(), 6);
    }

    struct FullDisk;

    impl SnapshotWriter for FullDisk {
        fn write_snapshot(&mut self, _snapshot: &StepSnapshot<'_>) -> Result<(), SnapshotError> {
            Err(SnapshotError::Other("no space left on device".into()))
        }
    }

    #[test]
    fn test_failed_snapshot_leaves_state_untouched() {
        let session = line_session(&[0.0, 0.5, 10.0, 100.0], 3);
        let mut selector = GreedySelector::new(&session, SequentialDispatcher, FullDisk).unwrap();

        let err = selector.step().unwrap_err();
        assert!(matches!(err, SitingError::Snapshot { step: 2, .. }));

        let state = selector.state();
        assert_eq!(state.selected(), &[0]);
        assert_eq!(state.remaining(), &[1, 2, 3]);
        assert_eq!(state.supply(), &[12.0, 0.0, 0.0, 0.0]);
        assert!(selector.steps().is_empty());
        assert!(selector.termination().is_none());
    }
}
