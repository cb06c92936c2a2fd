//! HTTP handlers for all web routes.

pub mod dashboard;
pub mod results;
pub mod experiments;
pub mod docking;
pub mod analysis;
pub mod files;

use serde::{Deserialize, Deserializer};

/// Query-string number where an empty value means "not given".
pub(crate) fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
