//! Region files, result sinks, configuration, and the multi-region batch runner
//! around [`siting_algo`].

pub mod config;
pub mod job;
pub mod manifest;
pub mod runner;
pub mod sink;

pub use config::{CapacityConfig, DecayConfig, Preset, RunnerConfig, SitingConfig};
pub use job::{jobs_from_files, RegionInput, RegionJob, RegionRecord, RegionStatus};
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest};
pub use runner::{run_batch, solve_region, BatchRunnerConfig, BatchSummary};
pub use sink::{
    region_dir_name, CsvResultSink, DirectorySnapshotWriter, MergedSelectionRow, ResultSink,
    SelectionRow, StepRow,
};
