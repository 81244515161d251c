use anyhow::{Context, Result};
use clap::Parser;
use siting_cli::{Cli, Commands};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    match &cli.command {
        Commands::Run {
            region,
            out,
            options,
        } => commands::run::handle(region, out, options),
        Commands::Batch {
            regions,
            out,
            options,
        } => commands::batch::handle(regions, out, options),
        Commands::Validate { region, options } => commands::validate::handle(region, options),
    }
}
