use super::metrics::{accessibility_metrics, coverage_percentage, rms_deviation};
use super::qp::{AllocationQp, QpSettings};
use super::{AccessibilityMetrics, CapacityOutcome, SolveFailure};
use crate::decay::gaussian_decay;
use crate::session::{CapacityBounds, RegionSession};
use faer::Mat;
use tracing::debug;

/// Solved allocation for one site set.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacitySolution {
    /// Candidate indices, in the order of `allocation`
    pub site_indices: Vec<usize>,
    /// Optimal capacity per site
    pub allocation: Vec<f64>,
    /// Accessibility index per demand point
    pub accessibility: Vec<f64>,
    /// `A_hat` of `accessibility`
    pub objective: f64,
}

impl CapacitySolution {
    pub fn total_allocated(&self) -> f64 {
        self.allocation.iter().sum()
    }
}

/// 2SFCA capacity optimizer for one region.
///
/// Built once per region; every field is read-only afterwards, so a shared
/// reference can be handed to any number of parallel evaluations.
#[derive(Debug, Clone)]
pub struct CapacityOptimizer {
    total_supply: f64,
    total_demand: f64,
    a_bar: f64,
    /// Decay weights, demand points × candidates
    weights: Mat<f64>,
    /// Diagonal of D
    demand: Vec<f64>,
    capture_range: f64,
    settings: QpSettings,
}

impl CapacityOptimizer {
    /// `demand` must hold one entry per row of `distances`.
    pub fn new(
        total_supply: f64,
        demand: &[f64],
        distances: &Mat<f64>,
        bandwidth: f64,
        capture_range: f64,
    ) -> Self {
        let total_demand: f64 = demand.iter().sum();
        Self {
            total_supply,
            total_demand,
            a_bar: total_supply / total_demand,
            weights: gaussian_decay(distances, bandwidth, capture_range),
            demand: demand.to_vec(),
            capture_range,
            settings: QpSettings::default(),
        }
    }

    pub fn from_session(session: &RegionSession) -> Self {
        Self::new(
            session.total_supply(),
            session.demand_values(),
            session.distance_matrix(),
            session.bandwidth(),
            session.capture_range(),
        )
    }

    pub fn with_settings(mut self, settings: QpSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn total_supply(&self) -> f64 {
        self.total_supply
    }

    pub fn total_demand(&self) -> f64 {
        self.total_demand
    }

    /// Target average accessibility (supply per unit of demand).
    pub fn a_bar(&self) -> f64 {
        self.a_bar
    }

    pub fn weights(&self) -> &Mat<f64> {
        &self.weights
    }

    pub fn capture_range(&self) -> f64 {
        self.capture_range
    }

    pub fn settings(&self) -> &QpSettings {
        &self.settings
    }

    /// Optimal allocation of the total supply over `sites`.
    ///
    /// `demand` weights the catchment normalization and the reported objective;
    /// the Hessian always uses the region's own demand. Never panics on bad
    /// numeric input: every failure comes back as a [`SolveFailure`].
    pub fn optimize_capacity(
        &self,
        sites: &[usize],
        demand: &[f64],
        bounds: CapacityBounds,
    ) -> CapacityOutcome {
        let p = self.contribution_matrix(sites, demand)?;
        let (m, k) = (p.nrows(), p.ncols());

        // O(m·k²) per candidate set at worst; zero-demand rows and entries of P
        // outside a site's capture range are skipped before the inner loop
        let mut hessian = vec![0.0; k * k];
        let mut linear = vec![0.0; k];
        for i in 0..m {
            let d = self.demand[i];
            if d == 0.0 {
                continue;
            }
            for a in 0..k {
                let pa = p.read(i, a);
                if pa == 0.0 {
                    continue;
                }
                linear[a] -= d * pa * self.a_bar;
                for b in a..k {
                    hessian[a * k + b] += d * pa * p.read(i, b);
                }
            }
        }
        for a in 0..k {
            hessian[a * k + a] += self.settings.stabilizer;
            for b in 0..a {
                hessian[a * k + b] = hessian[b * k + a];
            }
        }
        if hessian.iter().chain(&linear).any(|v| !v.is_finite()) {
            return Err(SolveFailure::NonFiniteModel);
        }

        let qp = AllocationQp {
            hessian,
            linear,
            total_supply: self.total_supply,
            bounds,
        };
        let allocation = qp.solve(&self.settings).map_err(|failure| {
            debug!(?sites, %failure, "capacity solve failed");
            failure
        })?;

        let accessibility = apply(&p, &allocation);
        let objective = self.rms_deviation(&accessibility, demand);

        Ok(CapacitySolution {
            site_indices: sites.to_vec(),
            allocation,
            accessibility,
            objective,
        })
    }

    /// Accessibility index for a given (not necessarily optimal) allocation.
    pub fn accessibility_for(
        &self,
        sites: &[usize],
        allocation: &[f64],
        demand: &[f64],
    ) -> Result<Vec<f64>, SolveFailure> {
        if allocation.len() != sites.len() {
            return Err(SolveFailure::AllocationMismatch {
                expected: sites.len(),
                found: allocation.len(),
            });
        }
        let p = self.contribution_matrix(sites, demand)?;
        Ok(apply(&p, allocation))
    }

    /// `A_hat`: demand-weighted RMS deviation from [`Self::a_bar`].
    pub fn rms_deviation(&self, accessibility: &[f64], demand: &[f64]) -> f64 {
        rms_deviation(accessibility, demand, self.a_bar, self.total_demand)
    }

    /// Full metric tuple (`A_hat`, extremes, MD, MAD, CV, Gini).
    pub fn calculate_metrics(&self, accessibility: &[f64], demand: &[f64]) -> AccessibilityMetrics {
        accessibility_metrics(accessibility, demand, self.a_bar, self.total_demand)
    }

    /// Share of demand within the capture range of any of `sites`, in percent.
    pub fn calculate_coverage(&self, sites: &[usize], distances: &Mat<f64>, demand: &[f64]) -> f64 {
        coverage_percentage(sites, |i, j| distances.read(i, j), demand, self.capture_range)
    }

    /// `P = F_sel · diag(g)` for `sites`.
    fn contribution_matrix(&self, sites: &[usize], demand: &[f64]) -> Result<Mat<f64>, SolveFailure> {
        if sites.is_empty() {
            return Err(SolveFailure::EmptySelection);
        }
        if demand.len() != self.weights.nrows() {
            return Err(SolveFailure::DemandMismatch {
                expected: self.weights.nrows(),
                found: demand.len(),
            });
        }
        let candidates = self.weights.ncols();
        if let Some(&index) = sites.iter().find(|&&s| s >= candidates) {
            return Err(SolveFailure::SiteOutOfRange { index, candidates });
        }

        let mut gains = Vec::with_capacity(sites.len());
        for &site in sites {
            let catchment: f64 = demand
                .iter()
                .enumerate()
                .map(|(i, d)| d * self.weights.read(i, site))
                .sum();
            if !(catchment.is_finite() && catchment > 0.0) {
                return Err(SolveFailure::EmptyCatchment { site });
            }
            gains.push(1.0 / catchment);
        }

        Ok(Mat::from_fn(self.weights.nrows(), sites.len(), |i, j| {
            self.weights.read(i, sites[j]) * gains[j]
        }))
    }
}

/// `P · x`
fn apply(p: &Mat<f64>, x: &[f64]) -> Vec<f64> {
    (0..p.nrows())
        .map(|i| (0..p.ncols()).map(|j| p.read(i, j) * x[j]).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn optimizer(distances: Vec<Vec<f64>>, demand: &[f64], supply: f64) -> CapacityOptimizer {
        let (m, n) = (distances.len(), distances[0].len());
        let mat = Mat::from_fn(m, n, |i, j| distances[i][j]);
        CapacityOptimizer::new(supply, demand, &mat, 2.0, 5.0)
    }

    #[test]
    fn test_a_bar_is_supply_per_demand() {
        let opt = optimizer(vec![vec![0.0]; 4], &[1.0, 1.0, 1.0, 1.0], 8.0);
        assert_eq!(opt.a_bar(), 2.0);
        assert_eq!(opt.total_demand(), 4.0);
    }

    #[test]
    fn test_empty_selection_fails() {
        let opt = optimizer(vec![vec![0.0]], &[1.0], 1.0);
        assert_eq!(
            opt.optimize_capacity(&[], &[1.0], CapacityBounds::default()),
            Err(SolveFailure::EmptySelection)
        );
    }

    #[test]
    fn test_demand_mismatch_fails() {
        let opt = optimizer(vec![vec![0.0], vec![1.0]], &[1.0, 1.0], 1.0);
        let outcome = opt.optimize_capacity(&[0], &[1.0], CapacityBounds::default());
        assert_eq!(
            outcome,
            Err(SolveFailure::DemandMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_out_of_range_site_fails() {
        let opt = optimizer(vec![vec![0.0]], &[1.0], 1.0);
        let outcome = opt.optimize_capacity(&[3], &[1.0], CapacityBounds::default());
        assert!(matches!(outcome, Err(SolveFailure::SiteOutOfRange { index: 3, .. })));
    }

    #[test]
    fn test_site_beyond_capture_range_has_empty_catchment() {
        let opt = optimizer(vec![vec![0.0, 9.0], vec![1.0, 9.0]], &[1.0, 1.0], 4.0);
        let outcome = opt.optimize_capacity(&[0, 1], &[1.0, 1.0], CapacityBounds::default());
        assert_eq!(outcome, Err(SolveFailure::EmptyCatchment { site: 1 }));
    }

    #[test]
    fn test_zero_call_demand_has_empty_catchment() {
        let opt = optimizer(vec![vec![0.0, 1.0], vec![1.0, 0.0]], &[1.0, 1.0], 4.0);
        let outcome = opt.optimize_capacity(&[0, 1], &[0.0, 0.0], CapacityBounds::default());
        assert_eq!(outcome, Err(SolveFailure::EmptyCatchment { site: 0 }));
    }

    #[test]
    fn test_accessibility_for_even_split() {
        // one site at distance 0 from both points: each point gets half the supply per unit demand
        let opt = optimizer(vec![vec![0.0], vec![0.0]], &[1.0, 1.0], 6.0);
        let ai = opt.accessibility_for(&[0], &[6.0], &[1.0, 1.0]).unwrap();
        assert_eq!(ai, vec![3.0, 3.0]);
    }

    #[test]
    fn test_coverage_uses_capture_range() {
        let distances = Mat::from_fn(3, 2, |i, j| if i == j { 1.0 } else { 50.0 });
        let opt = CapacityOptimizer::new(1.0, &[1.0, 1.0, 2.0], &distances, 2.0, 5.0);
        let demand = [1.0, 1.0, 2.0];
        assert!((opt.calculate_coverage(&[0], &distances, &demand) - 25.0).abs() < 1e-12);
        assert!((opt.calculate_coverage(&[0, 1], &distances, &demand) - 50.0).abs() < 1e-12);
    }
}
