//! INI serialization: `ConfigFile` → commented INI string.

use std::path::Path;

use super::file::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let catalog = config.paths.catalog.as_deref().unwrap_or("");

    format!(
        r#"[remote]
; Base URL of the image pyramid service. Tile URLs are formed as
; {{base_url}}{{remote_path}}/TileGroup5/{{zoom}}-{{x}}-{{y}}.jpg?siTop=..&siLeft=..&siWidth=..&siHeight=..
base_url = {}
; Timeout in seconds for each tile request (default: 30)
timeout = {}

[fetch]
; Maximum concurrent tile requests for one image (default: 300)
max_concurrency = {}
; Attempts per tile before it counts as failed (default: 5)
max_attempts = {}
; Seconds to sleep after a connection failure before retrying (default: 60)
retry_backoff = {}
; Failed tiles tolerated per image before its fetch is aborted (default: 0)
; 0 aborts the image on the first tile that exhausts its attempts
max_failed_tiles = {}
; Log a progress line every N images (default: 10)
progress_interval = {}

[grid]
; Tile grid shape at the full-resolution tier (default: independent)
;   independent - ceil(width/256) columns by ceil(height/256) rows
;   square      - as many rows as columns (legacy layout)
shape = {}

[stitch]
; Mosaic canvas size (default: tiles)
;   tiles    - span of the tiles actually present
;   declared - width and height from the catalog
extent = {}
; Revisit specimens whose manifest exists; existing mosaics are kept (default: false)
clobber = {}
; Threads for tile decoding and assembly; 0 uses all cores (default: 0)
threads = {}
; JPEG quality of written mosaics, 1-100 (default: 90)
jpeg_quality = {}

[paths]
; Root directory for downloaded tiles and completion markers
tile_root = {}
; Root directory for mosaics and manifests
output_root = {}
; Catalog CSV file or glob pattern (e.g. identifiers/*_identifiers.csv)
catalog = {}

[logging]
; Directory for the log file
directory = {}
; Log file name
file = {}
"#,
        config.remote.base_url,
        config.remote.timeout_secs,
        config.fetch.max_concurrency,
        config.fetch.max_attempts,
        config.fetch.retry_backoff_secs,
        config.fetch.max_failed_tiles,
        config.fetch.progress_interval,
        config.grid.shape,
        config.stitch.extent,
        config.stitch.clobber,
        config.stitch.threads,
        config.stitch.jpeg_quality,
        path_to_string(&config.paths.tile_root),
        path_to_string(&config.paths.output_root),
        catalog,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Render a path, abbreviating the home directory as `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
