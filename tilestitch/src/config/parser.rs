//! INI parsing: `Ini` → `ConfigFile`.
//!
//! The single place where INI key names map to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [remote] section
    if let Some(section) = ini.section(Some("remote")) {
        if let Some(v) = non_empty(section, "base_url") {
            config.remote.base_url = v.to_string();
        }
        if let Some(v) = section.get("timeout") {
            config.remote.timeout_secs =
                parse_positive(v, "remote", "timeout", "must be a positive integer (seconds)")?;
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("max_concurrency") {
            config.fetch.max_concurrency =
                parse_positive(v, "fetch", "max_concurrency", "must be a positive integer")?;
        }
        if let Some(v) = section.get("max_attempts") {
            config.fetch.max_attempts =
                parse_positive(v, "fetch", "max_attempts", "must be a positive integer")?;
        }
        if let Some(v) = section.get("retry_backoff") {
            config.fetch.retry_backoff_secs = parse_value(
                v,
                "fetch",
                "retry_backoff",
                "must be a non-negative integer (seconds)",
            )?;
        }
        if let Some(v) = section.get("max_failed_tiles") {
            config.fetch.max_failed_tiles = parse_value(
                v,
                "fetch",
                "max_failed_tiles",
                "must be a non-negative integer (0 aborts on the first failed tile)",
            )?;
        }
        if let Some(v) = section.get("progress_interval") {
            config.fetch.progress_interval =
                parse_positive(v, "fetch", "progress_interval", "must be a positive integer")?;
        }
    }

    // [grid] section
    if let Some(section) = ini.section(Some("grid")) {
        if let Some(v) = section.get("shape") {
            config.grid.shape =
                parse_value(v, "grid", "shape", "must be 'independent' or 'square'")?;
        }
    }

    // [stitch] section
    if let Some(section) = ini.section(Some("stitch")) {
        if let Some(v) = section.get("extent") {
            config.stitch.extent =
                parse_value(v, "stitch", "extent", "must be 'tiles' or 'declared'")?;
        }
        if let Some(v) = section.get("clobber") {
            config.stitch.clobber = parse_bool(v, "stitch", "clobber")?;
        }
        if let Some(v) = section.get("threads") {
            config.stitch.threads = parse_value(
                v,
                "stitch",
                "threads",
                "must be a non-negative integer (0 uses all cores)",
            )?;
        }
        if let Some(v) = section.get("jpeg_quality") {
            let quality: u8 = parse_value(v, "stitch", "jpeg_quality", "must be 1-100")?;
            if !(1..=100).contains(&quality) {
                return Err(invalid("stitch", "jpeg_quality", v, "must be 1-100"));
            }
            config.stitch.jpeg_quality = quality;
        }
    }

    // [paths] section
    if let Some(section) = ini.section(Some("paths")) {
        if let Some(v) = non_empty(section, "tile_root") {
            config.paths.tile_root = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "output_root") {
            config.paths.output_root = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "catalog") {
            config.paths.catalog = Some(v.to_string());
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section, "directory") {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "file") {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_value<T: FromStr>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_positive<T>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed: T = parse_value(value, section, key, reason)?;
    if parsed <= T::default() {
        return Err(invalid(section, key, value, reason));
    }
    Ok(parsed)
}

fn parse_bool(value: &str, section: &str, key: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(invalid(section, key, value, "must be true or false")),
    }
}

/// Expand a leading `~` to the home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
