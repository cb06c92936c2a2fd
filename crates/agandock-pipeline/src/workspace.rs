//! Queries over the experiment folders the CLI writes into.

use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use agandock_common::naming::{
    is_temporary_upload, sanitize_filename, table_display_name, validate_experiment_name,
};
use agandock_common::AgandockError;
use agandock_results::read_text_lossy;
use agandock_results::variant::{INTERACTION_DIR, RAW_FILE, VALIDITY_PASSED_FILE};

use crate::Result;

/// Protein-ligand complexes written by the PLIP stage.
pub const PLC_DIR: &str = "plc";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlcFiles {
    pub pdb_files: Vec<String>,
    pub plc_exists: bool,
    pub receptor_pdb: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlipTable {
    pub name: String,
    pub display_name: String,
}

/// The workspace root and the experiment folders below it.
#[derive(Debug, Clone)]
pub struct ExperimentWorkspace {
    root: PathBuf,
}

/// File names in `dir` accepted by `keep`, sorted. A missing directory yields `None`.
async fn file_names<F>(dir: &Path, keep: F) -> Result<Option<Vec<String>>>
where
    F: Fn(&str) -> bool,
{
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if keep(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(Some(names))
}

impl ExperimentWorkspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn experiment_dir(&self, experiment: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_experiment_name(experiment)?))
    }

    /// Sub-folders of the root that hold a docking `output.csv`, sorted.
    pub async fn list_experiments(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Workspace root {:?} does not exist", self.root);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut experiments = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if validate_experiment_name(&name).is_err() {
                continue;
            }
            if tokio::fs::try_exists(entry.path().join(RAW_FILE)).await.unwrap_or(false) {
                experiments.push(name);
            }
        }
        experiments.sort();
        debug!("Found {} experiments under {:?}", experiments.len(), self.root);
        Ok(experiments)
    }

    /// First receptor `.pdb` in the experiment folder, ignoring temporary uploads.
    pub async fn find_receptor_pdb(&self, experiment: &str) -> Result<Option<PathBuf>> {
        let dir = self.experiment_dir(experiment)?;
        let names = file_names(&dir, |name| name.ends_with(".pdb") && !is_temporary_upload(name))
            .await?
            .ok_or_else(|| AgandockError::NotAvailable(format!("Experiment '{experiment}' not found")))?;
        Ok(names.into_iter().next().map(|name| dir.join(name)))
    }

    pub async fn has_validity_results(&self, experiment: &str) -> Result<bool> {
        let path = self.experiment_dir(experiment)?.join(VALIDITY_PASSED_FILE);
        Ok(tokio::fs::try_exists(path).await?)
    }

    pub async fn plc_files(&self, experiment: &str) -> Result<PlcFiles> {
        let plc_dir = self.experiment_dir(experiment)?.join(PLC_DIR);
        let pdb_files = file_names(&plc_dir, |name| name.ends_with(".pdb")).await?;
        let receptor_pdb = self.find_receptor_pdb(experiment).await?;
        Ok(PlcFiles {
            plc_exists: pdb_files.is_some(),
            pdb_files: pdb_files.unwrap_or_default(),
            receptor_pdb,
        })
    }

    pub async fn plip_tables(&self, experiment: &str) -> Result<Vec<PlipTable>> {
        let dir = self.experiment_dir(experiment)?.join(INTERACTION_DIR);
        let names = file_names(&dir, |name| name.ends_with(".csv"))
            .await?
            .ok_or_else(|| {
                AgandockError::NotAvailable(format!("No PLIP results for '{experiment}'"))
            })?;
        Ok(names
            .into_iter()
            .map(|name| PlipTable {
                display_name: table_display_name(&name),
                name,
            })
            .collect())
    }

    /// The `interactions` array of `plc/report_<stem>.json` for one complex.
    /// A missing or malformed report reads as no interactions.
    pub async fn plip_report(&self, experiment: &str, complex: &str) -> Result<Vec<serde_json::Value>> {
        let complex = sanitize_filename(complex);
        let stem = complex.strip_suffix(".pdb").unwrap_or(&complex);
        let path = self
            .experiment_dir(experiment)?
            .join(PLC_DIR)
            .join(format!("report_{stem}.json"));

        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                debug!("No PLIP report at {:?}: {}", path, e);
                return Ok(Vec::new());
            }
        };
        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(mut report) => match report.get_mut("interactions").map(serde_json::Value::take) {
                Some(serde_json::Value::Array(interactions)) => Ok(interactions),
                _ => Ok(Vec::new()),
            },
            Err(e) => {
                warn!("Malformed PLIP report {:?}: {}", path, e);
                Ok(Vec::new())
            }
        }
    }

    /// Resolve `requested` to a path inside the root. Absolute paths must
    /// already lie under the root; relative ones may not climb out of it.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf> {
        let invalid = || AgandockError::InvalidInput(format!("Path '{requested}' is outside the workspace"));
        let requested = Path::new(requested);
        let relative = if requested.is_absolute() {
            requested.strip_prefix(&self.root).map_err(|_| invalid())?
        } else {
            requested
        };
        if relative.as_os_str().is_empty()
            || !relative.components().all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(invalid());
        }
        Ok(self.root.join(relative))
    }

    /// Read a text file strictly inside the workspace root.
    pub async fn read_workspace_file(&self, requested: &str) -> Result<String> {
        let path = self.resolve(requested)?;
        let canonical = match tokio::fs::canonicalize(&path).await {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AgandockError::NotAvailable(format!("File '{requested}' not found")));
            }
            Err(e) => return Err(e.into()),
        };
        let root = tokio::fs::canonicalize(&self.root).await?;
        if !canonical.starts_with(&root) {
            return Err(AgandockError::InvalidInput(format!(
                "Path '{requested}' is outside the workspace"
            )));
        }
        Ok(read_text_lossy(&canonical).await?)
    }
}
