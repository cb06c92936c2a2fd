//! The result tables one experiment can have.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use agandock_common::naming::sanitize_filename;
use agandock_common::AgandockError;

use crate::Result;

pub const RAW_FILE: &str = "output.csv";
pub const VALIDITY_PASSED_FILE: &str = "output_with_pb.csv";
pub const VALIDITY_FAILED_FILE: &str = "output_without_pb.csv";
pub const INTERACTION_DIR: &str = "output_plip_files";

/// Selects one result table of an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "table", rename_all = "snake_case")]
pub enum ResultVariant {
    /// Unfiltered docking output
    Raw,
    /// Poses that passed the PoseBusters validity checks
    ValidityPassed,
    /// Poses that failed them
    ValidityFailed,
    /// One PLIP interaction table, by file name
    InteractionAnnotated(String),
}

impl ResultVariant {
    /// Parse the URL selector used by the web API.
    ///
    /// `raw`, `passed`, `failed` and `interactions` (with a table name).
    pub fn from_selector(kind: &str, table: Option<&str>) -> Result<Self> {
        match kind {
            "raw" | "docking" => Ok(Self::Raw),
            "passed" | "validity_passed" => Ok(Self::ValidityPassed),
            "failed" | "validity_failed" => Ok(Self::ValidityFailed),
            "interactions" | "plip" => {
                let table = table.ok_or_else(|| {
                    AgandockError::InvalidInput("Interaction results need a table name".to_string())
                })?;
                Self::interaction_table(table)
            }
            other => Err(AgandockError::InvalidInput(format!("Unknown result variant '{other}'"))),
        }
    }

    /// Validate a PLIP table name; `.csv` is appended when missing.
    pub fn interaction_table(name: &str) -> Result<Self> {
        if name.is_empty() || name.starts_with('.') || sanitize_filename(name) != name {
            return Err(AgandockError::InvalidInput(format!("Invalid interaction table name '{name}'")));
        }
        let file = if name.ends_with(".csv") {
            name.to_string()
        } else {
            format!("{name}.csv")
        };
        Ok(Self::InteractionAnnotated(file))
    }

    pub fn selector(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::ValidityPassed => "passed",
            Self::ValidityFailed => "failed",
            Self::InteractionAnnotated(_) => "interactions",
        }
    }

    pub fn table_name(&self) -> Option<&str> {
        match self {
            Self::InteractionAnnotated(table) => Some(table),
            _ => None,
        }
    }

    /// Path of the table relative to the experiment folder.
    pub fn relative_path(&self) -> PathBuf {
        match self {
            Self::Raw => PathBuf::from(RAW_FILE),
            Self::ValidityPassed => PathBuf::from(VALIDITY_PASSED_FILE),
            Self::ValidityFailed => PathBuf::from(VALIDITY_FAILED_FILE),
            Self::InteractionAnnotated(table) => PathBuf::from(INTERACTION_DIR).join(table),
        }
    }

    pub fn export_suffix(&self) -> String {
        match self {
            Self::Raw => "docking".to_string(),
            Self::ValidityPassed => "posebusters_passed".to_string(),
            Self::ValidityFailed => "posebusters_failed".to_string(),
            Self::InteractionAnnotated(table) => {
                format!("plip_{}", table.strip_suffix(".csv").unwrap_or(table))
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Raw => "Docking results".to_string(),
            Self::ValidityPassed => "PoseBusters passed".to_string(),
            Self::ValidityFailed => "PoseBusters failed".to_string(),
            Self::InteractionAnnotated(table) => {
                format!("PLIP: {}", agandock_common::naming::table_display_name(table))
            }
        }
    }
}

impl fmt::Display for ResultVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InteractionAnnotated(table) => write!(f, "interactions/{}", table),
            other => f.write_str(other.selector()),
        }
    }
}
