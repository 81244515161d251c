//! Step trace and final selection produced by the greedy loop.

use crate::capacity::AccessibilityMetrics;
use serde::{Deserialize, Serialize};

/// One accepted greedy step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Number of selected sites after this step
    pub step: usize,
    /// Candidate column of the newly selected site
    pub candidate_index: usize,
    /// External id of the newly selected site
    pub selected_site: String,
    pub metrics: AccessibilityMetrics,
    /// Demand coverage of the selection after this step, in percent
    pub coverage: f64,
}

impl StepRecord {
    pub fn a_hat(&self) -> f64 {
        self.metrics.a_hat
    }
}

/// How the selection loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// The selection holds `target_site_count` sites.
    TargetReached,
    /// No remaining candidate could be solved at `step`; the result is partial.
    Infeasible { step: usize },
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::TargetReached => "target-reached",
            Termination::Infeasible { .. } => "infeasible",
        }
    }
}

/// Capacity assigned to one selected site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAllocation {
    pub candidate_index: usize,
    pub candidate_id: String,
    pub allocated_capacity: f64,
}

/// Everything the result sink needs for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub region_id: String,
    pub termination: Termination,
    pub target_site_count: usize,
    pub initial_count: usize,
    pub steps: Vec<StepRecord>,
    /// Final allocation in selection order (initial sites first)
    pub allocations: Vec<SiteAllocation>,
    /// Accessibility index of the final selection, if it could be evaluated
    pub accessibility: Option<Vec<f64>>,
    /// `A_hat` of the final selection, if it could be evaluated
    pub final_a_hat: Option<f64>,
    /// Demand coverage of the final selection, in percent
    pub coverage: f64,
}

impl SelectionOutcome {
    pub fn selected_count(&self) -> usize {
        self.allocations.len()
    }

    /// True unless the loop ended early.
    pub fn is_complete(&self) -> bool {
        matches!(self.termination, Termination::TargetReached)
    }

    pub fn total_allocated(&self) -> f64 {
        self.allocations.iter().map(|a| a.allocated_capacity).sum()
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "Siting Summary: {}\n{}\n",
            self.region_id,
            "=".repeat(40)
        ));
        s.push_str(&format!(
            "Status: {}\n",
            match self.termination {
                Termination::TargetReached => "Complete".to_string(),
                Termination::Infeasible { step } => format!("Terminated early at step {step}"),
            }
        ));
        s.push_str(&format!(
            "Sites: {} selected ({} initial, target {})\n",
            self.selected_count(),
            self.initial_count,
            self.target_site_count
        ));
        s.push_str(&format!("Total Capacity: {:.2}\n", self.total_allocated()));
        match self.final_a_hat {
            Some(a_hat) => s.push_str(&format!("A_hat: {:.5}\n", a_hat)),
            None => s.push_str("A_hat: n/a\n"),
        }
        s.push_str(&format!("Coverage: {:.2}%\n", self.coverage));

        if !self.allocations.is_empty() {
            s.push_str("\nAllocations:\n");
            for (i, a) in self.allocations.iter().enumerate() {
                let tag = if i < self.initial_count { "[INIT]" } else { "[NEW] " };
                s.push_str(&format!(
                    "  {} {} - {:.4}\n",
                    tag, a.candidate_id, a.allocated_capacity
                ));
            }
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(a_hat: f64) -> AccessibilityMetrics {
        AccessibilityMetrics {
            a_hat,
            min_ai: 0.0,
            max_ai: 1.0,
            max_deviation: 0.5,
            mean_abs_deviation: 0.25,
            coefficient_of_variation: 0.1,
            gini: 0.2,
        }
    }

    fn outcome(termination: Termination) -> SelectionOutcome {
        SelectionOutcome {
            region_id: "Census Tract 12".into(),
            termination,
            target_site_count: 3,
            initial_count: 1,
            steps: vec![StepRecord {
                step: 2,
                candidate_index: 4,
                selected_site: "osm-4".into(),
                metrics: metrics(0.01),
                coverage: 80.0,
            }],
            allocations: vec![
                SiteAllocation {
                    candidate_index: 0,
                    candidate_id: "osm-0".into(),
                    allocated_capacity: 6.0,
                },
                SiteAllocation {
                    candidate_index: 4,
                    candidate_id: "osm-4".into(),
                    allocated_capacity: 4.0,
                },
            ],
            accessibility: None,
            final_a_hat: Some(0.01),
            coverage: 80.0,
        }
    }

    #[test]
    fn test_summary_marks_initial_and_new_sites() {
        let summary = outcome(Termination::TargetReached).summary();
        assert!(summary.contains("Status: Complete"));
        assert!(summary.contains("[INIT] osm-0"));
        assert!(summary.contains("[NEW]  osm-4"));
        assert!(summary.contains("Total Capacity: 10.00"));
    }

    #[test]
    fn test_partial_outcome() {
        let o = outcome(Termination::Infeasible { step: 3 });
        assert!(!o.is_complete());
        assert_eq!(o.selected_count(), 2);
        assert!(o.summary().contains("Terminated early at step 3"));
    }

    #[test]
    fn test_termination_serializes_with_tag() {
        let json = serde_json::to_string(&Termination::Infeasible { step: 5 }).unwrap();
        assert_eq!(json, r#"{"kind":"infeasible","step":5}"#);
        assert_eq!(Termination::TargetReached.as_str(), "target-reached");
    }
}
