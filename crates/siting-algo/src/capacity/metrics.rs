//! Inequality metrics of an accessibility distribution.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Full metric tuple for one accessibility vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityMetrics {
    /// Demand-weighted RMS deviation from the target average (`A_hat`)
    pub a_hat: f64,
    pub min_ai: f64,
    pub max_ai: f64,
    /// Maximum absolute deviation from the target average
    pub max_deviation: f64,
    /// Demand-weighted mean absolute deviation
    pub mean_abs_deviation: f64,
    /// `a_hat / a_bar`
    pub coefficient_of_variation: f64,
    pub gini: f64,
}

/// Demand-weighted root-mean-square deviation of `accessibility` from `a_bar`.
///
/// Normalized by `total_demand` rather than by the sum of `demand`, so callers
/// can evaluate alternative demand vectors against a fixed reference total.
pub fn rms_deviation(accessibility: &[f64], demand: &[f64], a_bar: f64, total_demand: f64) -> f64 {
    let weighted: f64 = accessibility
        .iter()
        .zip(demand)
        .map(|(ai, d)| d * (ai - a_bar).powi(2))
        .sum();
    (weighted / total_demand).sqrt()
}

/// Compute every metric for `accessibility` weighted by `demand`.
pub fn accessibility_metrics(
    accessibility: &[f64],
    demand: &[f64],
    a_bar: f64,
    total_demand: f64,
) -> AccessibilityMetrics {
    let a_hat = rms_deviation(accessibility, demand, a_bar, total_demand);

    let mut min_ai = f64::INFINITY;
    let mut max_ai = f64::NEG_INFINITY;
    let mut max_deviation: f64 = 0.0;
    let mut weighted_abs = 0.0;
    for (&ai, &d) in accessibility.iter().zip(demand) {
        min_ai = min_ai.min(ai);
        max_ai = max_ai.max(ai);
        let dev = (ai - a_bar).abs();
        max_deviation = max_deviation.max(dev);
        weighted_abs += d * dev;
    }

    AccessibilityMetrics {
        a_hat,
        min_ai,
        max_ai,
        max_deviation,
        mean_abs_deviation: weighted_abs / total_demand,
        coefficient_of_variation: a_hat / a_bar,
        gini: weighted_gini(accessibility, demand),
    }
}

/// Demand-weighted Gini coefficient from the discrete Lorenz curve.
///
/// Points are sorted by accessibility; `P_k` is the cumulative demand share and
/// `T_k` the cumulative share of demand-weighted accessibility. With the curve
/// anchored at the origin,
///
/// ```text
/// G = Σ_k (P_k · T_{k+1} − T_k · P_{k+1})
/// ```
///
/// which is twice the area between the equality line and the trapezoidal
/// Lorenz curve. Equal accessibility everywhere gives `T_k == P_k` and hence 0.
pub fn weighted_gini(accessibility: &[f64], demand: &[f64]) -> f64 {
    let mut order: Vec<usize> = (0..accessibility.len().min(demand.len())).collect();
    order.sort_by(|&a, &b| {
        accessibility[a]
            .partial_cmp(&accessibility[b])
            .unwrap_or(Ordering::Equal)
    });

    let total_demand: f64 = order.iter().map(|&i| demand[i]).sum();
    let total_weighted: f64 = order.iter().map(|&i| accessibility[i] * demand[i]).sum();
    if total_demand <= 0.0 || total_weighted <= 0.0 || !total_weighted.is_finite() {
        // no supply reaches anyone, or nobody to weigh: nothing to be unequal about
        return 0.0;
    }

    let (mut p_prev, mut t_prev) = (0.0, 0.0);
    let (mut cum_d, mut cum_ad) = (0.0, 0.0);
    let mut area = 0.0;
    for &i in &order {
        cum_d += demand[i];
        cum_ad += accessibility[i] * demand[i];
        let p = cum_d / total_demand;
        let t = cum_ad / total_weighted;
        area += p_prev * t - t_prev * p;
        p_prev = p;
        t_prev = t;
    }

    area.clamp(0.0, 1.0)
}

/// Percentage of demand within `capture_range` of at least one of `sites`.
///
/// Binary coverage: the decay kernel plays no role. Returns 0 when there is no
/// demand at all.
pub fn coverage_percentage(
    sites: &[usize],
    distance: impl Fn(usize, usize) -> f64,
    demand: &[f64],
    capture_range: f64,
) -> f64 {
    let total: f64 = demand.iter().sum();
    if total == 0.0 {
        return 0.0;
    }

    let covered: f64 = demand
        .iter()
        .enumerate()
        .filter(|(i, _)| sites.iter().any(|&j| distance(*i, j) <= capture_range))
        .map(|(_, d)| d)
        .sum();

    100.0 * covered / total
}
