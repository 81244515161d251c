//! Capacity allocation tests

use faer::Mat;
use siting_algo::capacity::{weighted_gini, SolveFailure};
use siting_algo::{CapacityBounds, CapacityOptimizer, QpSettings};

const TOL: f64 = 1e-4;

/// Each demand point sits on its own candidate; all other pairs are out of range.
fn isolated_sites(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| if i == j { 0.0 } else { 100.0 })
}

#[test]
fn single_site_takes_all_supply() {
    let distances = Mat::from_fn(5, 1, |_, _| 0.0);
    let demand = vec![1.0; 5];
    let opt = CapacityOptimizer::new(10.0, &demand, &distances, 1000.0, 3000.0);

    let solution = opt
        .optimize_capacity(&[0], &demand, CapacityBounds::default())
        .unwrap();

    assert!((solution.allocation[0] - 10.0).abs() < TOL);
    for ai in &solution.accessibility {
        assert!((ai - 2.0).abs() < TOL);
    }
    assert!(solution.objective < TOL);

    let metrics = opt.calculate_metrics(&solution.accessibility, &demand);
    assert!(metrics.gini.abs() < TOL);
    assert!((metrics.min_ai - 2.0).abs() < TOL);
    assert!((metrics.max_ai - 2.0).abs() < TOL);
}

#[test]
fn allocation_follows_demand_when_unconstrained() {
    let distances = isolated_sites(3);
    let demand = vec![1.0, 2.0, 3.0];
    let opt = CapacityOptimizer::new(12.0, &demand, &distances, 2.0, 5.0);

    let solution = opt
        .optimize_capacity(&[0, 1, 2], &demand, CapacityBounds::unbounded())
        .unwrap();

    // a_bar = 2, so each site should get twice its catchment demand
    for (x, expected) in solution.allocation.iter().zip([2.0, 4.0, 6.0]) {
        assert!((x - expected).abs() < 1e-3, "{x} vs {expected}");
    }
    assert!((solution.total_allocated() - 12.0).abs() < 1e-6);
    assert!(solution.objective < 1e-3);
}

#[test]
fn binding_bounds_are_respected() {
    let distances = isolated_sites(3);
    let demand = vec![1.0, 1.0, 20.0];
    let opt = CapacityOptimizer::new(30.0, &demand, &distances, 2.0, 5.0);
    let bounds = CapacityBounds::new(Some(2.0), Some(25.0));

    let solution = opt.optimize_capacity(&[0, 1, 2], &demand, bounds).unwrap();

    assert!((solution.total_allocated() - 30.0).abs() < 1e-5);
    for x in &solution.allocation {
        assert!(*x >= 2.0 - 1e-5 && *x <= 25.0 + 1e-5, "allocation {x} out of bounds");
    }
    // the heavy site wants more than the cap allows
    assert!((solution.allocation[2] - 25.0).abs() < 1e-3);
}

#[test]
fn infeasible_bounds_fail_the_solve() {
    let distances = isolated_sites(2);
    let demand = vec![1.0, 1.0];
    let opt = CapacityOptimizer::new(10.0, &demand, &distances, 2.0, 5.0);
    let bounds = CapacityBounds::new(Some(1.0), Some(2.0));

    let outcome = opt.optimize_capacity(&[0, 1], &demand, bounds);
    assert!(matches!(outcome, Err(SolveFailure::Status(_))));
}

#[test]
fn zero_demand_call_fails_without_panicking() {
    let distances = isolated_sites(2);
    let opt = CapacityOptimizer::new(10.0, &[1.0, 1.0], &distances, 2.0, 5.0);
    let outcome = opt.optimize_capacity(&[0, 1], &[0.0, 0.0], CapacityBounds::default());
    assert!(matches!(outcome, Err(SolveFailure::EmptyCatchment { .. })));
}

#[test]
fn custom_settings_are_kept() {
    let distances = isolated_sites(1);
    let settings = QpSettings {
        max_iter: 50,
        ..QpSettings::default()
    };
    let opt = CapacityOptimizer::new(1.0, &[1.0], &distances, 2.0, 5.0).with_settings(settings);
    assert_eq!(opt.settings().max_iter, 50);
    assert!(opt.optimize_capacity(&[0], &[1.0], CapacityBounds::default()).is_ok());
}

#[test]
fn gini_of_uneven_allocation() {
    let gini = weighted_gini(&[0.0, 0.0, 0.0, 4.0], &[1.0, 1.0, 1.0, 1.0]);
    assert!((gini - 0.75).abs() < 1e-12);
}
