use crate::config::SitingConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use siting_algo::{RegionSession, RegionSessionBuilder, SitingResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One region as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInput {
    pub region_id: String,
    pub total_supply: f64,
    /// Defaults to the number of candidates.
    #[serde(default)]
    pub target_site_count: Option<usize>,
    pub demand_values: Vec<f64>,
    /// One row per demand point, one column per candidate.
    pub distance_matrix: Vec<Vec<f64>>,
    pub candidate_ids: Vec<String>,
    pub initial_site_ids: Vec<String>,
}

impl RegionInput {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening region file '{}'", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing region file '{}'", path.display()))
    }

    /// Validate against `config` and build the solver session.
    pub fn to_session(&self, config: &SitingConfig) -> SitingResult<RegionSession> {
        let mut builder = RegionSessionBuilder::new(&self.region_id)
            .total_supply(self.total_supply)
            .demand_values(self.demand_values.clone())
            .distance_rows(self.distance_matrix.clone())
            .candidate_ids(self.candidate_ids.iter().cloned())
            .initial_site_ids(self.initial_site_ids.iter().cloned())
            .bandwidth(config.bandwidth())
            .capture_range(config.capture_range())
            .capacity_bounds(config.capacity_bounds());
        if let Some(target) = self.target_site_count {
            builder = builder.target_site_count(target);
        }
        builder.build()
    }
}

/// A region file queued for a batch run.
#[derive(Debug, Clone)]
pub struct RegionJob {
    pub job_id: String,
    pub input_file: PathBuf,
}

/// Per-region outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    /// Target site count reached.
    Complete,
    /// Ended early because no remaining candidate could be solved.
    Partial,
    /// Input or output failed; nothing was selected.
    Error,
}

impl RegionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionStatus::Complete => "complete",
            RegionStatus::Partial => "partial",
            RegionStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRecord {
    pub job_id: String,
    pub region_id: Option<String>,
    pub input: String,
    pub status: RegionStatus,
    pub error: Option<String>,
    pub selected: usize,
    pub target: Option<usize>,
    pub steps: usize,
    pub final_a_hat: Option<f64>,
    pub coverage: Option<f64>,
    pub output: Option<String>,
}

/// Jobs for a list of region files; ids are the file stems.
pub fn jobs_from_files(files: &[PathBuf]) -> Vec<RegionJob> {
    files
        .iter()
        .enumerate()
        .map(|(i, path)| RegionJob {
            job_id: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("region-{i}")),
            input_file: path.clone(),
        })
        .collect()
}
