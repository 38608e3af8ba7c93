//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use tilestitch::catalog::CatalogError;
use tilestitch::config::ConfigFileError;
use tilestitch::fetch::FetchError;
use tilestitch::stitch::StitchError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Catalog could not be loaded
    Catalog(CatalogError),
    /// HTTP client or tokio runtime could not be created
    Runtime(String),
    /// Fetch stage setup failed
    Fetch(FetchError),
    /// Some identifiers were left unfetched or unstitched
    Incomplete {
        stage: &'static str,
        identifiers: Vec<String>,
    },
    /// Stitch stage failed
    Stitch(StitchError),
}

impl CliError {
    /// Exit the process with an error message and a non-zero code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Catalog(CatalogError::NoFilesMatched(_)) => {
                eprintln!();
                eprintln!("Pass --catalog with a CSV file or a glob such as");
                eprintln!("  'identifiers/*_identifiers.csv'");
                eprintln!("or set catalog under [paths] in the configuration file.");
            }
            CliError::Incomplete { stage: "fetched", .. } => {
                eprintln!();
                eprintln!("Downloaded tiles are kept. Re-run the same command to resume.");
            }
            CliError::Incomplete { .. } => {
                eprintln!();
                eprintln!("Specimen manifests were written; re-run with --clobber to retry.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Catalog(e) => write!(f, "Failed to load catalog: {}", e),
            CliError::Runtime(msg) => write!(f, "Failed to start: {}", msg),
            CliError::Fetch(e) => write!(f, "Fetch failed: {}", e),
            CliError::Incomplete { stage, identifiers } => write!(
                f,
                "{} identifier(s) could not be {}: {}",
                identifiers.len(),
                stage,
                identifiers.join(", ")
            ),
            CliError::Stitch(e) => write!(f, "Stitch failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Catalog(e) => Some(e),
            CliError::Fetch(e) => Some(e),
            CliError::Stitch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Fetch(e)
    }
}

impl From<StitchError> for CliError {
    fn from(e: StitchError) -> Self {
        CliError::Stitch(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_lists_identifiers() {
        let err = CliError::Incomplete {
            stage: "fetched",
            identifiers: vec!["0001".to_string(), "0007".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "2 identifier(s) could not be fetched: 0001, 0007"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CliError = ConfigFileError::InvalidValue {
            section: "fetch".to_string(),
            key: "max_attempts".to_string(),
            value: "many".to_string(),
            reason: "expected a positive integer".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Config(ref msg) if msg.contains("max_attempts")));
    }
}
