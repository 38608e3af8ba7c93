//! Configuration for tilestitch components.
//!
//! `ConfigFile` is the on-disk INI form. `FetchConfig` and `StitchConfig`
//! are the runtime objects handed to the fetch and stitch stages; both can be
//! built from a `ConfigFile` or directly with their `with_*` setters.
//!
//! # Example
//!
//! ```
//! use tilestitch::config::{ConfigFile, ExtentPolicy, StitchConfig};
//!
//! let file = ConfigFile::default();
//! let fetch = file.fetch_config();
//! assert_eq!(fetch.max_concurrency(), 300);
//!
//! let stitch = StitchConfig::new().with_extent_policy(ExtentPolicy::Declared);
//! assert!(!stitch.clobber());
//! ```

mod fetch;
mod file;
mod parser;
mod stitch;
mod writer;

pub use fetch::FetchConfig;
pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, FetchSettings, GridSettings,
    LoggingSettings, PathSettings, RemoteSettings, StitchSettings, DEFAULT_BASE_URL,
    DEFAULT_JPEG_QUALITY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_MAX_FAILED_TILES, DEFAULT_RETRY_BACKOFF_SECS,
};
pub use stitch::{ExtentPolicy, StitchConfig};
