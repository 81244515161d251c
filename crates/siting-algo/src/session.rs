//! Region session data structures
//!
//! A [`RegionSession`] is everything the selector needs to know about one
//! region: the supply to distribute, the demand points, the distance from every
//! demand point to every candidate, and the candidates that are already built.
//! Sessions are validated once at construction and never mutated afterwards.

use crate::error::{SitingError, SitingResult};
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Per-site allocation bounds applied to every selected site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityBounds {
    /// Minimum capacity per site, if any
    pub min: Option<f64>,
    /// Maximum capacity per site, if any
    pub max: Option<f64>,
}

impl CapacityBounds {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// No lower or upper bound; only the total-supply equality remains.
    pub fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Number of inequality rows these bounds add for `sites` variables.
    pub fn inequality_rows(&self, sites: usize) -> usize {
        let per_site = usize::from(self.min.is_some()) + usize::from(self.max.is_some());
        per_site * sites
    }
}

impl Default for CapacityBounds {
    /// At least one unit per site, no upper limit.
    fn default() -> Self {
        Self {
            min: Some(1.0),
            max: None,
        }
    }
}

/// Immutable input of one region's siting run.
#[derive(Debug, Clone)]
pub struct RegionSession {
    region_id: String,
    total_supply: f64,
    demand_values: Vec<f64>,
    distance_matrix: Mat<f64>,
    candidate_ids: Vec<String>,
    initial_site_indices: Vec<usize>,
    bandwidth: f64,
    capture_range: f64,
    bounds: CapacityBounds,
    target_site_count: usize,
}

impl RegionSession {
    pub fn region_id(&self) -> &str {
        &self.region_id
    }

    pub fn total_supply(&self) -> f64 {
        self.total_supply
    }

    pub fn demand_values(&self) -> &[f64] {
        &self.demand_values
    }

    /// Demand points × candidates.
    pub fn distance_matrix(&self) -> &Mat<f64> {
        &self.distance_matrix
    }

    pub fn candidate_ids(&self) -> &[String] {
        &self.candidate_ids
    }

    pub fn candidate_id(&self, index: usize) -> &str {
        &self.candidate_ids[index]
    }

    /// Mandatory sites, in the order they were supplied.
    pub fn initial_site_indices(&self) -> &[usize] {
        &self.initial_site_indices
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn capture_range(&self) -> f64 {
        self.capture_range
    }

    pub fn bounds(&self) -> CapacityBounds {
        self.bounds
    }

    pub fn target_site_count(&self) -> usize {
        self.target_site_count
    }

    pub fn num_demand_points(&self) -> usize {
        self.demand_values.len()
    }

    pub fn num_candidates(&self) -> usize {
        self.candidate_ids.len()
    }

    pub fn total_demand(&self) -> f64 {
        self.demand_values.iter().sum()
    }
}

/// Builder for [`RegionSession`].
///
/// Defaults follow the suburban study setting: bandwidth 1500, capture range
/// 4000, at least one unit per site, and a target equal to the candidate count.
pub struct RegionSessionBuilder {
    region_id: String,
    total_supply: f64,
    demand_values: Vec<f64>,
    distance_rows: Vec<Vec<f64>>,
    candidate_ids: Vec<String>,
    initial_ids: Vec<String>,
    initial_indices: Vec<usize>,
    bandwidth: f64,
    capture_range: f64,
    bounds: CapacityBounds,
    target_site_count: Option<usize>,
}

impl RegionSessionBuilder {
    pub fn new(region_id: impl Into<String>) -> Self {
        Self {
            region_id: region_id.into(),
            total_supply: 0.0,
            demand_values: Vec::new(),
            distance_rows: Vec::new(),
            candidate_ids: Vec::new(),
            initial_ids: Vec::new(),
            initial_indices: Vec::new(),
            bandwidth: 1500.0,
            capture_range: 4000.0,
            bounds: CapacityBounds::default(),
            target_site_count: None,
        }
    }

    pub fn total_supply(mut self, total_supply: f64) -> Self {
        self.total_supply = total_supply;
        self
    }

    pub fn demand_values(mut self, demand_values: Vec<f64>) -> Self {
        self.demand_values = demand_values;
        self
    }

    /// Distance matrix as one row per demand point.
    pub fn distance_rows(mut self, rows: Vec<Vec<f64>>) -> Self {
        self.distance_rows = rows;
        self
    }

    pub fn candidate_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidate_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Mandatory sites by external id. Ids that do not name a candidate are
    /// skipped with a warning.
    pub fn initial_site_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initial_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Mandatory sites by candidate column index.
    pub fn initial_site_indices<I>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        self.initial_indices = indices.into_iter().collect();
        self
    }

    pub fn bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn capture_range(mut self, capture_range: f64) -> Self {
        self.capture_range = capture_range;
        self
    }

    pub fn capacity_bounds(mut self, bounds: CapacityBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn target_site_count(mut self, target: usize) -> Self {
        self.target_site_count = Some(target);
        self
    }

    /// Validate the inputs and build the session.
    pub fn build(self) -> SitingResult<RegionSession> {
        let region = self.region_id.clone();
        let n_demand = self.demand_values.len();
        let n_candidates = self.candidate_ids.len();

        positive("total_supply", self.total_supply, &region)?;
        positive("bandwidth", self.bandwidth, &region)?;
        positive("capture_range", self.capture_range, &region)?;

        for (i, &d) in self.demand_values.iter().enumerate() {
            if !d.is_finite() || d < 0.0 {
                return Err(SitingError::InvalidValue {
                    region,
                    what: "demand_values",
                    position: format!("index {i}"),
                    value: d,
                });
            }
        }
        let total_demand: f64 = self.demand_values.iter().sum();
        if !(total_demand.is_finite() && total_demand > 0.0) {
            return Err(SitingError::InvalidTotalDemand {
                region,
                total: total_demand,
            });
        }

        if self.distance_rows.len() != n_demand {
            return Err(SitingError::LengthMismatch {
                region,
                what: "distance_matrix rows".into(),
                expected: n_demand,
                found: self.distance_rows.len(),
            });
        }
        for (i, row) in self.distance_rows.iter().enumerate() {
            if row.len() != n_candidates {
                return Err(SitingError::LengthMismatch {
                    region,
                    what: format!("distance_matrix row {i}"),
                    expected: n_candidates,
                    found: row.len(),
                });
            }
            if let Some((j, &d)) = row
                .iter()
                .enumerate()
                .find(|(_, d)| !d.is_finite() || **d < 0.0)
            {
                return Err(SitingError::InvalidValue {
                    region,
                    what: "distance_matrix",
                    position: format!("({i}, {j})"),
                    value: d,
                });
            }
        }

        let mut seen = HashSet::with_capacity(n_candidates);
        for id in &self.candidate_ids {
            if !seen.insert(id.as_str()) {
                return Err(SitingError::DuplicateCandidate {
                    region,
                    id: id.clone(),
                });
            }
        }

        if let (Some(min), Some(max)) = (self.bounds.min, self.bounds.max) {
            if min > max {
                return Err(SitingError::InvertedBounds { region, min, max });
            }
        }

        let initial = resolve_initial_sites(
            &region,
            &self.candidate_ids,
            &self.initial_ids,
            &self.initial_indices,
        )?;
        if initial.is_empty() {
            return Err(SitingError::NoInitialSites { region });
        }

        let target = self.target_site_count.unwrap_or(n_candidates);
        if target < initial.len() || target > n_candidates {
            return Err(SitingError::InvalidTarget {
                region,
                target,
                initial: initial.len(),
                candidates: n_candidates,
            });
        }

        let rows = self.distance_rows;
        let distance_matrix = Mat::from_fn(n_demand, n_candidates, |i, j| rows[i][j]);

        Ok(RegionSession {
            region_id: self.region_id,
            total_supply: self.total_supply,
            demand_values: self.demand_values,
            distance_matrix,
            candidate_ids: self.candidate_ids,
            initial_site_indices: initial,
            bandwidth: self.bandwidth,
            capture_range: self.capture_range,
            bounds: self.bounds,
            target_site_count: target,
        })
    }
}

fn positive(name: &'static str, value: f64, region: &str) -> SitingResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SitingError::InvalidParameter {
            region: region.to_string(),
            name,
            expected: "positive and finite",
            value,
        })
    }
}

/// Merge initial sites given by index and by id, dropping duplicates while
/// keeping first-seen order.
fn resolve_initial_sites(
    region: &str,
    candidate_ids: &[String],
    ids: &[String],
    indices: &[usize],
) -> SitingResult<Vec<usize>> {
    let mut resolved: Vec<usize> = Vec::with_capacity(indices.len() + ids.len());

    for &index in indices {
        if index >= candidate_ids.len() {
            return Err(SitingError::InitialSiteOutOfRange {
                region: region.to_string(),
                index,
                candidates: candidate_ids.len(),
            });
        }
        if !resolved.contains(&index) {
            resolved.push(index);
        }
    }

    for id in ids {
        match candidate_ids.iter().position(|c| c == id) {
            Some(index) if !resolved.contains(&index) => resolved.push(index),
            Some(_) => {}
            None => warn!(region, id = %id, "initial site is not among the candidates, skipping"),
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RegionSessionBuilder {
        RegionSessionBuilder::new("tract-1")
            .total_supply(10.0)
            .demand_values(vec![1.0, 2.0])
            .distance_rows(vec![vec![0.0, 100.0, 200.0], vec![50.0, 60.0, 70.0]])
            .candidate_ids(["a", "b", "c"])
            .initial_site_ids(["a"])
            .target_site_count(2)
    }

    #[test]
    fn test_builder_resolves_initial_ids() {
        let session = base().build().expect("valid session");
        assert_eq!(session.initial_site_indices(), &[0]);
        assert_eq!(session.num_demand_points(), 2);
        assert_eq!(session.num_candidates(), 3);
        assert_eq!(session.distance_matrix().read(1, 2), 70.0);
        assert_eq!(session.total_demand(), 3.0);
    }

    #[test]
    fn test_unknown_initial_ids_are_skipped() {
        let session = base()
            .initial_site_ids(["a", "zzz", "c"])
            .target_site_count(3)
            .build()
            .unwrap();
        assert_eq!(session.initial_site_indices(), &[0, 2]);
    }

    #[test]
    fn test_indices_and_ids_merge_without_duplicates() {
        let session = base()
            .initial_site_indices([1, 0])
            .initial_site_ids(["a"])
            .build()
            .unwrap();
        assert_eq!(session.initial_site_indices(), &[1, 0]);
    }

    #[test]
    fn test_empty_initial_set_is_rejected() {
        let err = base().initial_site_ids(["nope"]).build().unwrap_err();
        assert!(matches!(err, SitingError::NoInitialSites { .. }));
        assert!(err.to_string().contains("tract-1"));
    }

    #[test]
    fn test_zero_total_demand_is_rejected() {
        let err = base().demand_values(vec![0.0, 0.0]).build().unwrap_err();
        assert!(matches!(err, SitingError::InvalidTotalDemand { .. }));
    }

    #[test]
    fn test_row_length_mismatch_is_rejected() {
        let err = base()
            .distance_rows(vec![vec![0.0, 1.0, 2.0], vec![0.0, 1.0]])
            .build()
            .unwrap_err();
        match err {
            SitingError::LengthMismatch {
                what,
                expected,
                found,
                ..
            } => {
                assert_eq!(what, "distance_matrix row 1");
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_demand_row_count_mismatch_is_rejected() {
        let err = base().demand_values(vec![1.0]).build().unwrap_err();
        assert!(matches!(err, SitingError::LengthMismatch { .. }));
    }

    #[test]
    fn test_negative_distance_is_rejected() {
        let err = base()
            .distance_rows(vec![vec![0.0, -1.0, 2.0], vec![0.0, 1.0, 2.0]])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("(0, 1)"));
    }

    #[test]
    fn test_duplicate_candidates_are_rejected() {
        let err = base().candidate_ids(["a", "b", "a"]).build().unwrap_err();
        assert!(matches!(err, SitingError::DuplicateCandidate { id, .. } if id == "a"));
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let err = base()
            .capacity_bounds(CapacityBounds::new(Some(5.0), Some(2.0)))
            .build()
            .unwrap_err();
        assert!(matches!(err, SitingError::InvertedBounds { .. }));
    }

    #[test]
    fn test_target_outside_range_is_rejected() {
        let err = base().target_site_count(4).build().unwrap_err();
        assert!(matches!(err, SitingError::InvalidTarget { .. }));

        let err = base()
            .initial_site_ids(["a", "b"])
            .target_site_count(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, SitingError::InvalidTarget { .. }));
    }

    #[test]
    fn test_target_defaults_to_candidate_count() {
        let session = RegionSessionBuilder::new("r")
            .total_supply(4.0)
            .demand_values(vec![1.0])
            .distance_rows(vec![vec![0.0, 0.0]])
            .candidate_ids(["x", "y"])
            .initial_site_indices([0])
            .build()
            .unwrap();
        assert_eq!(session.target_site_count(), 2);
    }

    #[test]
    fn test_non_positive_bandwidth_is_rejected() {
        let err = base().bandwidth(0.0).build().unwrap_err();
        assert!(matches!(
            err,
            SitingError::InvalidParameter {
                name: "bandwidth",
                ..
            }
        ));
    }

    #[test]
    fn test_inequality_rows() {
        assert_eq!(CapacityBounds::default().inequality_rows(3), 3);
        assert_eq!(CapacityBounds::new(Some(2.0), Some(25.0)).inequality_rows(3), 6);
        assert_eq!(CapacityBounds::unbounded().inequality_rows(3), 0);
    }
}
