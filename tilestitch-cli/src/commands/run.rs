//! Run command: fetch, then stitch whatever is on disk.

use std::collections::HashSet;

use clap::Args;
use tilestitch::catalog::Catalog;
use tilestitch::config::ConfigFile;
use tilestitch::fetch::FetchSummary;
use tracing::warn;

use super::common::{resolve_catalog, CommonArgs, FetchOptions, StitchOptions};
use super::{fetch, stitch};
use crate::error::CliError;

/// Arguments for `tilestitch run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub fetch: FetchOptions,

    #[command(flatten)]
    pub stitch: StitchOptions,
}

impl RunArgs {
    pub fn apply(&self, config: &mut ConfigFile) {
        self.common.apply(config);
        self.fetch.apply(config);
        self.stitch.apply(config);
    }
}

/// Both stages over one catalog.
///
/// Identifiers whose fetch aborted are left out of the stitch stage, so no
/// partial mosaic is written for them; a later run picks them up once their
/// tiles are complete. The command still fails.
pub fn run(config: &ConfigFile) -> Result<(), CliError> {
    let catalog = resolve_catalog(config)?;

    let fetched = fetch::fetch_catalog(config, &catalog)?;
    fetch::print_summary(&fetched);

    let catalog = without_aborted(catalog, &fetched);
    let stitched = stitch::stitch_catalog(config, &catalog)?;
    stitch::print_summary(config, &stitched);

    fetch::check(fetched)?;
    stitch::check(stitched)
}

/// Drops the identifiers the fetch stage could not complete.
fn without_aborted(mut catalog: Catalog, fetched: &FetchSummary) -> Catalog {
    if fetched.aborted.is_empty() {
        return catalog;
    }
    let aborted: HashSet<&str> = fetched.aborted.iter().map(String::as_str).collect();
    catalog.retain(|record| !aborted.contains(record.identifier.as_str()));
    warn!(
        held_back = aborted.len(),
        "Not stitching identifiers with incomplete tiles"
    );
    catalog
}
