use anyhow::{bail, Result};
use siting_batch::{jobs_from_files, run_batch, BatchRunnerConfig};
use siting_cli::SitingArgs;
use std::path::{Path, PathBuf};

use crate::commands::util::resolve_config;

pub fn handle(regions: &[PathBuf], out: &Path, options: &SitingArgs) -> Result<()> {
    let config = resolve_config(options)?;
    let summary = run_batch(&BatchRunnerConfig {
        jobs: jobs_from_files(regions),
        output_root: out.to_path_buf(),
        config,
    })?;

    println!(
        "Batch: {} complete, {} partial, {} failed",
        summary.complete, summary.partial, summary.error
    );
    for record in &summary.regions {
        match &record.error {
            Some(error) => println!("  {} [{}]: {}", record.job_id, record.status.as_str(), error),
            None => println!("  {} [{}]", record.job_id, record.status.as_str()),
        }
    }
    println!("Manifest: {}", summary.manifest_path.display());
    println!("Merged selection: {}", summary.merged_selection_path.display());

    if !summary.regions.is_empty() && summary.error == summary.regions.len() {
        bail!("every region in the batch failed");
    }
    Ok(())
}
