//! Fan-out of candidate evaluations and fan-in to the best one.
//!
//! Each greedy step submits one independent evaluation per remaining
//! candidate. Evaluations only read shared state, so any dispatcher may run
//! them concurrently; results always come back in submission order so that
//! the reduction in [`select_best`] is deterministic.

use crate::capacity::{CapacityOutcome, CapacitySolution};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use std::sync::Arc;

/// Result of evaluating one candidate.
#[derive(Debug, Clone)]
pub struct CandidateEvaluation {
    pub candidate: usize,
    pub outcome: CapacityOutcome,
}

impl CandidateEvaluation {
    /// Objective of the solve, `+∞` when it failed.
    pub fn objective(&self) -> f64 {
        match &self.outcome {
            Ok(solution) => solution.objective,
            Err(_) => f64::INFINITY,
        }
    }

    pub fn is_solved(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs a batch of independent candidate evaluations.
pub trait CandidateDispatcher {
    /// Evaluate every entry of `candidates`, returning results in the same order.
    fn dispatch<F>(&self, candidates: &[usize], evaluate: F) -> Vec<CandidateEvaluation>
    where
        F: Fn(usize) -> CapacityOutcome + Sync + Send;

    fn name(&self) -> &'static str;
}

/// Evaluates candidates one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDispatcher;

impl CandidateDispatcher for SequentialDispatcher {
    fn dispatch<F>(&self, candidates: &[usize], evaluate: F) -> Vec<CandidateEvaluation>
    where
        F: Fn(usize) -> CapacityOutcome + Sync + Send,
    {
        candidates
            .iter()
            .map(|&candidate| CandidateEvaluation {
                candidate,
                outcome: evaluate(candidate),
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "sequential"
    }
}

/// Evaluates candidates on a rayon worker pool.
///
/// Without a dedicated pool the work runs on whichever pool is current, which
/// lets a batch runner nest region-level and candidate-level parallelism on a
/// single set of threads.
#[cfg(feature = "parallel")]
#[derive(Debug, Clone, Default)]
pub struct RayonDispatcher {
    pool: Option<Arc<rayon::ThreadPool>>,
}

#[cfg(feature = "parallel")]
impl RayonDispatcher {
    /// Use the current (or global) rayon pool.
    pub fn ambient() -> Self {
        Self { pool: None }
    }

    /// Dedicated pool; `threads == 0` sizes it to the available cores.
    pub fn with_threads(threads: usize) -> Result<Self, rayon::ThreadPoolBuildError> {
        let threads = if threads == 0 {
            num_cpus::get()
        } else {
            threads
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("siting-eval-{i}"))
            .build()?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

#[cfg(feature = "parallel")]
impl CandidateDispatcher for RayonDispatcher {
    fn dispatch<F>(&self, candidates: &[usize], evaluate: F) -> Vec<CandidateEvaluation>
    where
        F: Fn(usize) -> CapacityOutcome + Sync + Send,
    {
        let run = || {
            candidates
                .par_iter()
                .map(|&candidate| CandidateEvaluation {
                    candidate,
                    outcome: evaluate(candidate),
                })
                .collect::<Vec<_>>()
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    fn name(&self) -> &'static str {
        "rayon"
    }
}

/// Pick the evaluation with the strictly smallest finite objective.
///
/// Ties keep the earliest evaluation; failed evaluations never win. Returns
/// `None` when nothing was solved.
pub fn select_best(evaluations: Vec<CandidateEvaluation>) -> Option<(usize, CapacitySolution)> {
    let mut best: Option<(usize, CapacitySolution)> = None;
    for evaluation in evaluations {
        let Ok(solution) = evaluation.outcome else {
            continue;
        };
        if !solution.objective.is_finite() {
            continue;
        }
        let better = match &best {
            Some((_, current)) => solution.objective < current.objective,
            None => true,
        };
        if better {
            best = Some((evaluation.candidate, solution));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::SolveFailure;

    fn solved(candidate: usize, objective: f64) -> CapacityOutcome {
        Ok(CapacitySolution {
            site_indices: vec![0, candidate],
            allocation: vec![1.0, 1.0],
            accessibility: vec![1.0],
            objective,
        })
    }

    fn fake(candidate: usize) -> CapacityOutcome {
        match candidate {
            1 => solved(1, 0.5),
            2 => Err(SolveFailure::EmptyCatchment { site: 2 }),
            3 => solved(3, 0.2),
            4 => solved(4, 0.2),
            _ => solved(candidate, f64::NAN),
        }
    }

    #[test]
    fn test_sequential_preserves_order() {
        let evals = SequentialDispatcher.dispatch(&[4, 1, 2], fake);
        let order: Vec<usize> = evals.iter().map(|e| e.candidate).collect();
        assert_eq!(order, vec![4, 1, 2]);
        assert_eq!(evals[2].objective(), f64::INFINITY);
        assert!(!evals[2].is_solved());
    }

    #[test]
    fn test_select_best_breaks_ties_by_position() {
        let evals = SequentialDispatcher.dispatch(&[1, 2, 3, 4], fake);
        let (candidate, solution) = select_best(evals).unwrap();
        assert_eq!(candidate, 3);
        assert_eq!(solution.objective, 0.2);

        let evals = SequentialDispatcher.dispatch(&[4, 3], fake);
        assert_eq!(select_best(evals).unwrap().0, 4);
    }

    #[test]
    fn test_select_best_ignores_failures_and_nan() {
        let evals = SequentialDispatcher.dispatch(&[2, 9], fake);
        assert!(select_best(evals).is_none());
        assert!(select_best(Vec::new()).is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_rayon_matches_sequential() {
        let candidates: Vec<usize> = (0..64).map(|i| i % 5).collect();
        let dispatcher = RayonDispatcher::with_threads(4).unwrap();
        assert_eq!(dispatcher.num_threads(), 4);

        let parallel = dispatcher.dispatch(&candidates, fake);
        let sequential = SequentialDispatcher.dispatch(&candidates, fake);
        let p: Vec<usize> = parallel.iter().map(|e| e.candidate).collect();
        let s: Vec<usize> = sequential.iter().map(|e| e.candidate).collect();
        assert_eq!(p, s);
        assert_eq!(
            select_best(parallel).map(|b| b.0),
            select_best(sequential).map(|b| b.0)
        );
    }
}
