//! Result and snapshot persistence.
//!
//! Layout under the output root, per region:
//!
//! ```text
//! <root>/<region>/<region>.csv        step trace
//! <root>/<region>/selection.csv       final allocation
//! <root>/<region>/supply/supply_<n>.ssv
//! <root>/<region>/Ai/Ai_<n>.ssv
//! ```

use anyhow::{Context, Result};
use csv::Writer;
use serde::{Deserialize, Serialize};
use siting_algo::{SelectionOutcome, SnapshotError, SnapshotWriter, StepRecord, StepSnapshot};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One row of the step trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRow {
    pub step: usize,
    pub selected_site: String,
    #[serde(rename = "A_hat")]
    pub a_hat: f64,
    #[serde(rename = "min_Ai")]
    pub min_ai: f64,
    #[serde(rename = "max_Ai")]
    pub max_ai: f64,
    #[serde(rename = "MD")]
    pub max_deviation: f64,
    #[serde(rename = "MAD")]
    pub mean_abs_deviation: f64,
    #[serde(rename = "CV")]
    pub coefficient_of_variation: f64,
    #[serde(rename = "Gini")]
    pub gini: f64,
}

impl From<&StepRecord> for StepRow {
    fn from(record: &StepRecord) -> Self {
        let m = &record.metrics;
        Self {
            step: record.step,
            selected_site: record.selected_site.clone(),
            a_hat: m.a_hat,
            min_ai: m.min_ai,
            max_ai: m.max_ai,
            max_deviation: m.max_deviation,
            mean_abs_deviation: m.mean_abs_deviation,
            coefficient_of_variation: m.coefficient_of_variation,
            gini: m.gini,
        }
    }
}

/// One row of the final selection table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRow {
    pub candidate_id: String,
    pub allocated_capacity: f64,
}

/// Selection row tagged with its region, for the merged batch table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedSelectionRow {
    pub region_id: String,
    pub candidate_id: String,
    pub allocated_capacity: f64,
}

/// Destination for a finished region.
pub trait ResultSink {
    /// Persist `outcome`, returning the region's output directory.
    fn write_outcome(&mut self, outcome: &SelectionOutcome) -> Result<PathBuf>;
}

/// Writes the step trace and final selection as CSV files.
#[derive(Debug, Clone)]
pub struct CsvResultSink {
    root: PathBuf,
}

impl CsvResultSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn region_dir(&self, region_id: &str) -> PathBuf {
        region_dir(&self.root, region_id)
    }
}

impl ResultSink for CsvResultSink {
    fn write_outcome(&mut self, outcome: &SelectionOutcome) -> Result<PathBuf> {
        let dir = self.region_dir(&outcome.region_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating region directory '{}'", dir.display()))?;

        let trace_path = dir.join(format!("{}.csv", region_dir_name(&outcome.region_id)));
        write_rows(&trace_path, outcome.steps.iter().map(StepRow::from))?;

        let selection_path = dir.join("selection.csv");
        write_rows(
            &selection_path,
            outcome.allocations.iter().map(|a| SelectionRow {
                candidate_id: a.candidate_id.clone(),
                allocated_capacity: a.allocated_capacity,
            }),
        )?;

        Ok(dir)
    }
}

/// Writes per-step vectors as space-separated text.
///
/// Supply is rounded to four decimals. Accessibility values are often tiny
/// (supply per unit of demand), so they are written in shortest round-trip
/// scientific notation.
#[derive(Debug, Clone)]
pub struct DirectorySnapshotWriter {
    dir: PathBuf,
}

impl DirectorySnapshotWriter {
    /// Snapshots for `region_id` under `root`.
    pub fn new(root: &Path, region_id: &str) -> Self {
        Self {
            dir: region_dir(root, region_id),
        }
    }

    pub fn supply_path(&self, step: usize) -> PathBuf {
        self.dir.join("supply").join(format!("supply_{step}.ssv"))
    }

    pub fn accessibility_path(&self, step: usize) -> PathBuf {
        self.dir.join("Ai").join(format!("Ai_{step}.ssv"))
    }
}

impl SnapshotWriter for DirectorySnapshotWriter {
    fn write_snapshot(&mut self, snapshot: &StepSnapshot<'_>) -> Result<(), SnapshotError> {
        write_vector(&self.supply_path(snapshot.step), snapshot.supply, |v| {
            format!("{v:.4}")
        })?;
        write_vector(
            &self.accessibility_path(snapshot.step),
            snapshot.accessibility,
            |v| format!("{v:e}"),
        )?;
        Ok(())
    }
}

/// Write serializable rows (with header) to a CSV file.
pub fn write_rows<T, I>(path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file =
        File::create(path).with_context(|| format!("creating CSV file '{}'", path.display()))?;
    let mut writer = Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("writing row to '{}'", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing CSV writer for '{}'", path.display()))?;
    Ok(())
}

fn write_vector(
    path: &Path,
    values: &[f64],
    format_value: impl Fn(f64) -> String,
) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(File::create(path)?);
    let line = values
        .iter()
        .map(|&v| format_value(v))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{line}")?;
    out.flush()
}

fn region_dir(root: &Path, region_id: &str) -> PathBuf {
    root.join(region_dir_name(region_id))
}

/// Directory name for a region's outputs.
///
/// Region ids may contain path separators; those are replaced by `_`, so two
/// distinct ids can map to the same directory.
pub fn region_dir_name(region_id: &str) -> String {
    let name: String = region_id
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match name.trim() {
        "" | "." | ".." => "_".to_string(),
        _ => name,
    }
}
