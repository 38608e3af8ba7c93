//! Tolerant integer parsing for catalog columns.
//!
//! Tabular tools write integer columns that contain gaps as floats
//! (`1234.0`), so whole numbers are accepted in either spelling.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

pub(super) fn whole<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw = String::deserialize(deserializer)?;
    parse_whole(&raw).map_err(D::Error::custom)
}

pub(super) fn optional_whole<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_whole(&raw).map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

fn parse_whole<T: TryFrom<i64>>(raw: &str) -> Result<T, String> {
    let raw = raw.trim();
    let value = match raw.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let float: f64 = raw
                .parse()
                .map_err(|_| format!("'{}' is not a whole number", raw))?;
            if !float.is_finite() || float.fract() != 0.0 {
                return Err(format!("'{}' is not a whole number", raw));
            }
            float as i64
        }
    };
    T::try_from(value).map_err(|_| format!("{} is out of range", raw))
}
