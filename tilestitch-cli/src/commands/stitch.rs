//! Stitch command: rebuild mosaics from the tiles on disk.

use clap::Args;
use tilestitch::catalog::Catalog;
use tilestitch::config::ConfigFile;
use tilestitch::stitch::{StitchCoordinator, StitchSummary};

use super::common::{resolve_catalog, CommonArgs, StitchOptions};
use crate::error::CliError;

/// Arguments for `tilestitch stitch`.
#[derive(Debug, Args)]
pub struct StitchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub stitch: StitchOptions,
}

impl StitchArgs {
    pub fn apply(&self, config: &mut ConfigFile) {
        self.common.apply(config);
        self.stitch.apply(config);
    }
}

/// Run the stitch stage over the configured catalog.
pub fn run(config: &ConfigFile) -> Result<(), CliError> {
    let catalog = resolve_catalog(config)?;
    let summary = stitch_catalog(config, &catalog)?;
    print_summary(config, &summary);
    check(summary)
}

pub fn stitch_catalog(config: &ConfigFile, catalog: &Catalog) -> Result<StitchSummary, CliError> {
    let coordinator = StitchCoordinator::new(config.layout(), config.stitch_config())?;
    Ok(coordinator.run(catalog)?)
}

pub fn print_summary(config: &ConfigFile, summary: &StitchSummary) {
    println!();
    println!("Stitch summary:");
    println!("  Written:    {}", summary.written);
    println!("  Existing:   {}", summary.existing);
    println!("  No tiles:   {}", summary.no_tiles.len());
    println!("  Failed:     {}", summary.failed.len());
    println!("  Specimens skipped: {}", summary.specimens_skipped);
    println!(
        "  Manifest:   {} ({} rows)",
        config.layout().global_manifest_path().display(),
        summary.global_rows
    );
}

/// Failed reconstructions make the command fail. Identifiers without tiles
/// are reported but tolerated.
pub fn check(summary: StitchSummary) -> Result<(), CliError> {
    if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            stage: "stitched",
            identifiers: summary.failed,
        })
    }
}
