//! Clarabel formulation of the capacity-allocation QP.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    (1/2)x'Hx + q'x
//! subject to  Ax + s = b,   s ∈ K
//! ```
//!
//! The allocation problem maps onto it with one zero-cone row for the supply
//! balance and one nonnegative-cone row per active bound:
//!
//! ```text
//!   Σ x_j + s = S          s ∈ {0}     (total supply)
//!  -x_j   + s = -min       s ≥ 0       (x_j ≥ min)
//!   x_j   + s = max        s ≥ 0       (x_j ≤ max)
//! ```

use super::SolveFailure;
use crate::session::CapacityBounds;
use clarabel::{
    algebra::CscMatrix,
    solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT},
};
use serde::{Deserialize, Serialize};

/// Numerical settings for each capacity solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QpSettings {
    /// Added to the Hessian diagonal to keep it positive definite under roundoff
    pub stabilizer: f64,
    /// Interior-point iteration cap
    pub max_iter: u32,
    /// Wall-clock limit per solve in seconds (infinite = none)
    pub time_limit_secs: f64,
}

impl Default for QpSettings {
    fn default() -> Self {
        Self {
            stabilizer: 1e-8,
            max_iter: 200,
            time_limit_secs: f64::INFINITY,
        }
    }
}

/// Dense QP data for one site set.
pub(crate) struct AllocationQp {
    /// Row-major `k × k` Hessian (symmetric)
    pub hessian: Vec<f64>,
    /// Linear term, length `k`
    pub linear: Vec<f64>,
    pub total_supply: f64,
    pub bounds: CapacityBounds,
}

impl AllocationQp {
    fn dim(&self) -> usize {
        self.linear.len()
    }

    /// Upper triangle of the Hessian in CSC form, as Clarabel expects.
    fn hessian_csc(&self) -> CscMatrix<f64> {
        let k = self.dim();
        let mut col_ptr = Vec::with_capacity(k + 1);
        let mut row_idx = Vec::with_capacity(k * (k + 1) / 2);
        let mut values = Vec::with_capacity(k * (k + 1) / 2);

        for col in 0..k {
            col_ptr.push(row_idx.len());
            for row in 0..=col {
                row_idx.push(row);
                values.push(self.hessian[row * k + col]);
            }
        }
        col_ptr.push(row_idx.len());

        CscMatrix::new(k, k, col_ptr, row_idx, values)
    }

    /// Constraint matrix, right-hand side and cones.
    fn constraints(&self) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        let k = self.dim();
        let has_min = self.bounds.min.is_some();
        let n_rows = 1 + self.bounds.inequality_rows(k);
        let max_offset = 1 + if has_min { k } else { 0 };

        // Every column touches the balance row and at most two bound rows,
        // already in increasing row order.
        let mut col_ptr = Vec::with_capacity(k + 1);
        let mut row_idx = Vec::with_capacity(3 * k);
        let mut values = Vec::with_capacity(3 * k);
        for j in 0..k {
            col_ptr.push(row_idx.len());
            row_idx.push(0);
            values.push(1.0);
            if has_min {
                row_idx.push(1 + j);
                values.push(-1.0);
            }
            if self.bounds.max.is_some() {
                row_idx.push(max_offset + j);
                values.push(1.0);
            }
        }
        col_ptr.push(row_idx.len());

        let mut rhs = Vec::with_capacity(n_rows);
        rhs.push(self.total_supply);
        if let Some(min) = self.bounds.min {
            rhs.extend(std::iter::repeat(-min).take(k));
        }
        if let Some(max) = self.bounds.max {
            rhs.extend(std::iter::repeat(max).take(k));
        }

        let mut cones = vec![SupportedConeT::ZeroConeT(1)];
        if n_rows > 1 {
            cones.push(SupportedConeT::NonnegativeConeT(n_rows - 1));
        }

        (
            CscMatrix::new(n_rows, k, col_ptr, row_idx, values),
            rhs,
            cones,
        )
    }

    /// Solve and return the primal allocation.
    pub fn solve(&self, settings: &QpSettings) -> Result<Vec<f64>, SolveFailure> {
        let p_mat = self.hessian_csc();
        let (a_mat, rhs, cones) = self.constraints();

        let settings = DefaultSettingsBuilder::default()
            .verbose(false)
            .max_iter(settings.max_iter)
            .time_limit(settings.time_limit_secs)
            .build()
            .map_err(|e| SolveFailure::Setup(format!("Clarabel settings error: {:?}", e)))?;

        let mut solver = DefaultSolver::new(&p_mat, &self.linear, &a_mat, &rhs, &cones, settings)
            .map_err(|e| SolveFailure::Setup(format!("Clarabel initialization failed: {:?}", e)))?;

        solver.solve();

        let sol = &solver.solution;
        if !matches!(sol.status, SolverStatus::Solved | SolverStatus::AlmostSolved) {
            return Err(SolveFailure::Status(format!("{:?}", sol.status)));
        }
        if sol.x.iter().any(|v| !v.is_finite()) {
            return Err(SolveFailure::NonFiniteSolution);
        }

        Ok(sol.x.clone())
    }
}
