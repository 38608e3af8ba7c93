//! Fetch command: download the tiles of every catalogued image.

use std::sync::Arc;

use clap::Args;
use tilestitch::catalog::Catalog;
use tilestitch::config::ConfigFile;
use tilestitch::fetch::{FetchCoordinator, FetchSummary, ReqwestTileClient};
use tokio::runtime::Runtime;

use super::common::{resolve_catalog, CommonArgs, FetchOptions};
use crate::error::CliError;

/// Arguments for `tilestitch fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub fetch: FetchOptions,
}

impl FetchArgs {
    pub fn apply(&self, config: &mut ConfigFile) {
        self.common.apply(config);
        self.fetch.apply(config);
    }
}

/// Run the fetch stage over the configured catalog.
pub fn run(config: &ConfigFile) -> Result<(), CliError> {
    let catalog = resolve_catalog(config)?;
    let summary = fetch_catalog(config, &catalog)?;
    print_summary(&summary);
    check(summary)
}

/// Fetch a catalog on a fresh runtime.
pub fn fetch_catalog(config: &ConfigFile, catalog: &Catalog) -> Result<FetchSummary, CliError> {
    let runtime = Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;
    let fetch = config.fetch_config();

    runtime.block_on(async {
        let client = Arc::new(ReqwestTileClient::new(fetch.request_timeout())?);
        let coordinator = FetchCoordinator::new(client, config.layout(), fetch);
        Ok::<_, CliError>(coordinator.run(catalog).await)
    })
}

pub fn print_summary(summary: &FetchSummary) {
    println!();
    println!("Fetch summary:");
    println!("  Completed:  {}", summary.completed);
    println!("  Skipped:    {} (already complete)", summary.skipped);
    println!("  Aborted:    {}", summary.aborted.len());
    println!(
        "  Tiles:      {} downloaded, {} missing upstream, {} failed",
        summary.tiles.downloaded, summary.tiles.not_found, summary.tiles.failed
    );
}

/// An incomplete identifier makes the command fail.
pub fn check(summary: FetchSummary) -> Result<(), CliError> {
    if summary.is_clean() {
        Ok(())
    } else {
        Err(CliError::Incomplete {
            stage: "fetched",
            identifiers: summary.aborted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_summary_passes() {
        let summary = FetchSummary {
            completed: 2,
            skipped: 1,
            ..Default::default()
        };
        assert!(check(summary).is_ok());
    }

    #[test]
    fn test_aborted_identifiers_fail() {
        let summary = FetchSummary {
            completed: 1,
            aborted: vec!["0004".to_string()],
            ..Default::default()
        };
        match check(summary) {
            Err(CliError::Incomplete { stage, identifiers }) => {
                assert_eq!(stage, "fetched");
                assert_eq!(identifiers, vec!["0004".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
