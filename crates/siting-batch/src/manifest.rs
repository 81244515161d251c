use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::SitingConfig;
use crate::job::{RegionRecord, RegionStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchManifest {
    pub created_at: DateTime<Utc>,
    pub config: SitingConfig,
    pub num_regions: usize,
    pub complete: usize,
    pub partial: usize,
    pub error: usize,
    pub regions: Vec<RegionRecord>,
}

impl BatchManifest {
    pub fn new(config: SitingConfig, regions: Vec<RegionRecord>) -> Self {
        let count = |status: RegionStatus| regions.iter().filter(|r| r.status == status).count();
        Self {
            created_at: Utc::now(),
            config,
            num_regions: regions.len(),
            complete: count(RegionStatus::Complete),
            partial: count(RegionStatus::Partial),
            error: count(RegionStatus::Error),
            regions,
        }
    }
}

pub fn write_batch_manifest(path: &Path, manifest: &BatchManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json =
        serde_json::to_string_pretty(manifest).context("serializing batch manifest to JSON")?;
    fs::write(path, json)
        .with_context(|| format!("writing batch manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_batch_manifest(path: &Path) -> Result<BatchManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening batch manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing batch manifest '{}'", path.display()))
}
