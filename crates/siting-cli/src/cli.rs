use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Greedy equitable facility siting", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select sites and allocate capacity for one region
    Run {
        /// Region JSON file
        #[arg(long, value_hint = ValueHint::FilePath)]
        region: PathBuf,
        /// Output directory (a subdirectory per region is created)
        #[arg(long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        #[command(flatten)]
        options: SitingArgs,
    },
    /// Run many regions in parallel and write a batch manifest
    Batch {
        /// Region JSON files
        #[arg(long, num_args = 1.., required = true, value_hint = ValueHint::FilePath)]
        regions: Vec<PathBuf>,
        /// Output root for all regions
        #[arg(long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        #[command(flatten)]
        options: SitingArgs,
    },
    /// Check a region file without solving
    Validate {
        /// Region JSON file
        #[arg(long, value_hint = ValueHint::FilePath)]
        region: PathBuf,
        #[command(flatten)]
        options: SitingArgs,
    },
}

/// Settings shared by every subcommand; flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SitingArgs {
    /// TOML configuration file
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Study-area preset (urban, suburban, rural)
    #[arg(long)]
    pub preset: Option<String>,

    /// Gaussian decay bandwidth
    #[arg(long)]
    pub bandwidth: Option<f64>,

    /// Distance beyond which a site has no influence
    #[arg(long)]
    pub capture_range: Option<f64>,

    /// Minimum capacity per selected site
    #[arg(long)]
    pub min_capacity: Option<f64>,

    /// Maximum capacity per selected site
    #[arg(long)]
    pub max_capacity: Option<f64>,

    /// Worker threads (0 = one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Save per-step supply and accessibility vectors
    #[arg(long)]
    pub save_intermediate: bool,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
