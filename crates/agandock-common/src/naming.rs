//! Naming rules for experiment folders and uploaded files.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AgandockError, Result};

static EXPERIMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex"));

// pdb_<timestamp>_<uuid>.pdb, written while staging uploads
static TEMPORARY_UPLOAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"pdb_\d+_[a-f0-9-]+\.pdb").expect("valid regex"));

/// Experiment folder names may only contain letters, digits, `_` and `-`.
pub fn validate_experiment_name(name: &str) -> Result<&str> {
    if EXPERIMENT_NAME.is_match(name) {
        Ok(name)
    } else {
        Err(AgandockError::InvalidInput(format!(
            "Invalid experiment name '{name}' (must contain only letters, numbers, underscores, or hyphens)"
        )))
    }
}

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name, "_").into_owned();
    // A bare "." or ".." would escape the experiment folder.
    if cleaned.trim_matches('.').is_empty() {
        format!("upload_{}", cleaned.len())
    } else {
        cleaned
    }
}

pub fn is_temporary_upload(file_name: &str) -> bool {
    TEMPORARY_UPLOAD.is_match(file_name)
}

/// `hydrogen_bonds.csv` -> `Hydrogen Bonds`
pub fn table_display_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
