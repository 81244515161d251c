use anyhow::{Context, Result};
use siting_algo::CapacityOptimizer;
use siting_batch::RegionInput;
use siting_cli::SitingArgs;
use std::path::Path;

use crate::commands::util::resolve_config;

pub fn handle(region: &Path, options: &SitingArgs) -> Result<()> {
    let config = resolve_config(options)?;
    let input = RegionInput::load(region)?;
    let session = input
        .to_session(&config)
        .with_context(|| format!("validating region '{}'", input.region_id))?;

    let optimizer = CapacityOptimizer::from_session(&session);
    let weights = optimizer.weights();
    let demand = session.demand_values();
    let unreachable: Vec<&str> = (0..session.num_candidates())
        .filter(|&j| {
            (0..session.num_demand_points()).all(|i| demand[i] * weights.read(i, j) <= 0.0)
        })
        .map(|j| session.candidate_id(j))
        .collect();

    println!("Region file is valid: {}", session.region_id());
    println!("  Demand points: {}", session.num_demand_points());
    println!("  Candidates: {}", session.num_candidates());
    println!(
        "  Initial sites: {} (target {})",
        session.initial_site_indices().len(),
        session.target_site_count()
    );
    println!("  Total supply: {:.2}", session.total_supply());
    println!("  Total demand: {:.2}", session.total_demand());
    println!("  A_bar: {:.5}", optimizer.a_bar());
    println!(
        "  Decay: bandwidth {} / capture range {} ({})",
        session.bandwidth(),
        session.capture_range(),
        config.preset()
    );
    if !unreachable.is_empty() {
        println!(
            "  Warning: {} candidate(s) reach no demand and will never be selected: {}",
            unreachable.len(),
            unreachable.join(", ")
        );
    }
    Ok(())
}
