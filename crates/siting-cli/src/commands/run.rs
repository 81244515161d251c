use anyhow::Result;
use siting_algo::RayonDispatcher;
use siting_batch::{solve_region, RegionInput};
use siting_cli::SitingArgs;
use std::path::Path;
use tracing::info;

use crate::commands::util::{configure_threads, resolve_config};

pub fn handle(region: &Path, out: &Path, options: &SitingArgs) -> Result<()> {
    let config = resolve_config(options)?;
    configure_threads(config.runner.threads);

    let input = RegionInput::load(region)?;
    info!(
        region = %input.region_id,
        preset = %config.preset(),
        bandwidth = config.bandwidth(),
        capture_range = config.capture_range(),
        "loaded region"
    );

    let (outcome, dir) = solve_region(&input, &config, out, RayonDispatcher::ambient())?;

    println!("{}", outcome.summary());
    if !outcome.is_complete() {
        println!(
            "Warning: only {}/{} sites could be placed",
            outcome.selected_count(),
            outcome.target_site_count
        );
    }
    println!("Results written to {}", dir.display());
    Ok(())
}
