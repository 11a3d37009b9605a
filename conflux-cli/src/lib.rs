//! Command-line front end for fetching, conflating and importing candidate
//! map geometry.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod import;
mod logging;

pub use error::CliError;
pub use import::{FailedTile, ImportSummary};

use import::ImportArgs;

const ARG_BBOX: &str = "bbox";
const ARG_SOURCE_URL: &str = "source-url";
const ARG_REFERENCE: &str = "reference";
const ARG_MAX_TILE_SIDE: &str = "max-tile-side";
const ARG_WORKERS: &str = "workers";
const ARG_SNAP_DISTANCE: &str = "snap-distance";
const ARG_MAX_ANGLE: &str = "max-angle";
const ARG_TAG_RULES: &str = "tag-rules";
const ARG_OUTPUT: &str = "output";
const ARG_LOG_LEVEL: &str = "log-level";
const ENV_BBOX: &str = "CONFLUX_CMDS_IMPORT_BBOX";
const ENV_SOURCE_URL: &str = "CONFLUX_CMDS_IMPORT_SOURCE_URL";

/// Run the Conflux CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Import(args) => import::run_import(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "conflux",
    about = "Conflate candidate map geometry into existing data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch candidates for a region, conflate them and plan their import.
    Import(ImportArgs),
}

#[cfg(test)]
mod tests;
