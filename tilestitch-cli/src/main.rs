//! tilestitch CLI - Command-line interface
//!
//! Downloads tiled image pyramids listed in a CSV catalog and stitches each
//! image back into a full-resolution mosaic.

mod commands;
mod error;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tilestitch::config::ConfigFile;
use tracing::info;

use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use commands::run::RunArgs;
use commands::stitch::StitchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "tilestitch")]
#[command(version = tilestitch::VERSION)]
#[command(about = "Download tiled image pyramids and stitch them into mosaics", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.config/tilestitch/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the tiles of every catalogued image
    Fetch(FetchArgs),

    /// Reconstruct mosaics from downloaded tiles and write manifests
    Stitch(StitchArgs),

    /// Fetch, then stitch
    Run(RunArgs),

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        e.exit();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config(command) => commands::config::run(command, config_path),
        Commands::Fetch(args) => {
            let config = effective_config(config_path, |c| args.apply(c))?;
            with_logging(&config, cli.verbose, "fetch", commands::fetch::run)
        }
        Commands::Stitch(args) => {
            let config = effective_config(config_path, |c| args.apply(c))?;
            with_logging(&config, cli.verbose, "stitch", commands::stitch::run)
        }
        Commands::Run(args) => {
            let config = effective_config(config_path, |c| args.apply(c))?;
            with_logging(&config, cli.verbose, "run", commands::run::run)
        }
    }
}

/// Configuration file values with command-line overrides applied.
fn effective_config(
    path: Option<&Path>,
    apply: impl FnOnce(&mut ConfigFile),
) -> Result<ConfigFile, CliError> {
    let mut config = commands::common::load_config(path)?;
    apply(&mut config);
    Ok(config)
}

fn with_logging(
    config: &ConfigFile,
    verbose: bool,
    command: &str,
    run: fn(&ConfigFile) -> Result<(), CliError>,
) -> Result<(), CliError> {
    // Flushes the log file when dropped.
    let _guard = commands::common::start_logging(config, verbose)?;
    info!(version = tilestitch::VERSION, command, "tilestitch starting");

    let result = run(config);
    if let Err(e) = &result {
        tracing::error!(error = %e, "{} did not complete", command);
    }
    result
}
