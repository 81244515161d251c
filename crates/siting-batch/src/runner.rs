use crate::config::SitingConfig;
use crate::job::{RegionInput, RegionJob, RegionRecord, RegionStatus};
use crate::manifest::{write_batch_manifest, BatchManifest};
use crate::sink::{
    region_dir_name, write_rows, CsvResultSink, DirectorySnapshotWriter, MergedSelectionRow,
    ResultSink,
};
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use siting_algo::{
    CandidateDispatcher, CapacityOptimizer, GreedySelector, NoSnapshots, RayonDispatcher,
    SelectionOutcome, SnapshotWriter,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Inputs of a batch run.
pub struct BatchRunnerConfig {
    pub jobs: Vec<RegionJob>,
    pub output_root: PathBuf,
    pub config: SitingConfig,
}

/// Summary returned after the run so callers can report counts and output locations.
pub struct BatchSummary {
    pub complete: usize,
    pub partial: usize,
    pub error: usize,
    pub manifest_path: PathBuf,
    pub merged_selection_path: PathBuf,
    pub regions: Vec<RegionRecord>,
}

/// Run the greedy selection for one region and persist its tables.
///
/// Snapshots go under `output_root` when `save_intermediate` is set. The
/// caller picks the dispatcher that evaluates candidates within each step.
pub fn solve_region<D: CandidateDispatcher>(
    input: &RegionInput,
    config: &SitingConfig,
    output_root: &Path,
    dispatcher: D,
) -> Result<(SelectionOutcome, PathBuf)> {
    let session = input
        .to_session(config)
        .with_context(|| format!("validating region '{}'", input.region_id))?;
    let optimizer = CapacityOptimizer::from_session(&session).with_settings(config.qp_settings());

    let mut snapshots: Box<dyn SnapshotWriter> = if config.runner.save_intermediate {
        Box::new(DirectorySnapshotWriter::new(output_root, &input.region_id))
    } else {
        Box::new(NoSnapshots)
    };
    let outcome = GreedySelector::with_optimizer(&session, optimizer, dispatcher, &mut *snapshots)?
        .run()
        .with_context(|| format!("selecting sites for region '{}'", input.region_id))?;

    let mut sink = CsvResultSink::new(output_root);
    let dir = sink.write_outcome(&outcome)?;
    Ok((outcome, dir))
}

pub fn run_batch(config: &BatchRunnerConfig) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;

    // threads=0 means one worker per core
    let thread_count = if config.config.runner.threads == 0 {
        num_cpus::get()
    } else {
        config.config.runner.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .thread_name(|i| format!("siting-batch-{i}"))
        .build()
        .context("building Rayon thread pool for batch runs")?;

    info!(
        regions = config.jobs.len(),
        threads = thread_count,
        output = %config.output_root.display(),
        "starting batch"
    );

    let inputs: Vec<Result<RegionInput>> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| RegionInput::load(&job.input_file))
            .collect()
    });
    let inputs = claim_output_dirs(&config.jobs, inputs);

    // Regions and the candidates inside each step share one pool.
    let results: Vec<(RegionRecord, Vec<MergedSelectionRow>)> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .zip(inputs)
            .map(|(job, input)| run_job(job, input, config))
            .collect()
    });

    let mut regions = Vec::with_capacity(results.len());
    let mut merged = Vec::new();
    for (record, rows) in results {
        regions.push(record);
        merged.extend(rows);
    }

    let merged_selection_path = config.output_root.join("merged_selection.csv");
    write_rows(&merged_selection_path, merged)?;

    let manifest = BatchManifest::new(config.config.clone(), regions);
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;

    info!(
        complete = manifest.complete,
        partial = manifest.partial,
        error = manifest.error,
        "batch finished"
    );

    Ok(BatchSummary {
        complete: manifest.complete,
        partial: manifest.partial,
        error: manifest.error,
        manifest_path,
        merged_selection_path,
        regions: manifest.regions,
    })
}

/// Give each output directory to the first job that names it.
///
/// Later jobs whose region id maps to an already claimed directory fail
/// instead of overwriting it.
fn claim_output_dirs(
    jobs: &[RegionJob],
    inputs: Vec<Result<RegionInput>>,
) -> Vec<Result<RegionInput>> {
    let mut claimed: HashMap<String, &str> = HashMap::new();
    jobs.iter()
        .zip(inputs)
        .map(|(job, input)| {
            let input = input?;
            let dir = region_dir_name(&input.region_id);
            if let Some(owner) = claimed.get(&dir) {
                bail!(
                    "region id '{}' clashes with job '{}': both write to '{}'",
                    input.region_id,
                    owner,
                    dir
                );
            }
            claimed.insert(dir, &job.job_id);
            Ok(input)
        })
        .collect()
}

/// Execute a single region job; failures become an `error` record.
fn run_job(
    job: &RegionJob,
    input: Result<RegionInput>,
    config: &BatchRunnerConfig,
) -> (RegionRecord, Vec<MergedSelectionRow>) {
    let mut record = RegionRecord {
        job_id: job.job_id.clone(),
        region_id: input.as_ref().ok().map(|i| i.region_id.clone()),
        input: job.input_file.display().to_string(),
        status: RegionStatus::Error,
        error: None,
        selected: 0,
        target: None,
        steps: 0,
        final_a_hat: None,
        coverage: None,
        output: None,
    };

    let runner = || -> Result<(SelectionOutcome, PathBuf)> {
        let input = input?;
        solve_region(
            &input,
            &config.config,
            &config.output_root,
            RayonDispatcher::ambient(),
        )
    };

    match runner() {
        Ok((outcome, dir)) => {
            record.status = if outcome.is_complete() {
                RegionStatus::Complete
            } else {
                RegionStatus::Partial
            };
            record.selected = outcome.selected_count();
            record.target = Some(outcome.target_site_count);
            record.steps = outcome.steps.len();
            record.final_a_hat = outcome.final_a_hat;
            record.coverage = Some(outcome.coverage);
            record.output = Some(dir.display().to_string());

            let rows = outcome
                .allocations
                .iter()
                .map(|a| MergedSelectionRow {
                    region_id: outcome.region_id.clone(),
                    candidate_id: a.candidate_id.clone(),
                    allocated_capacity: a.allocated_capacity,
                })
                .collect();
            (record, rows)
        }
        Err(err) => {
            error!(job = %job.job_id, "region failed: {err:#}");
            record.error = Some(format!("{err:#}"));
            (record, Vec::new())
        }
    }
}
