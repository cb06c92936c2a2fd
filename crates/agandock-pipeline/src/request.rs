//! Docking requests: validation and staging of uploaded files.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, warn};

use agandock_common::naming::{sanitize_filename, validate_experiment_name};
use agandock_common::AgandockError;
use agandock_results::variant::RAW_FILE;

use crate::runner::{DockingJob, LigandInput};
use crate::Result;

static SMILES_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@+\-\[\]()\\/=#%.]+$").expect("valid regex"));

/// How ligands are supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// A CSV of SMILES ("Multiple SMILES")
    Csv,
    /// One SMILES string ("Single SMILES")
    Smiles,
}

impl FromStr for InputType {
    type Err = AgandockError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "csv" | "Multiple SMILES" => Ok(InputType::Csv),
            "smiles" | "Single SMILES" => Ok(InputType::Smiles),
            other => Err(AgandockError::InvalidInput(format!("Unknown input type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// A docking submission as received from the form. Every field is optional
/// here; [`DockingRequest::validate`] decides what is missing.
#[derive(Debug, Clone, Default)]
pub struct DockingRequest {
    pub experiment: Option<String>,
    pub pdb_file: Option<UploadedFile>,
    pub pdbqt_file: Option<UploadedFile>,
    pub config_file: Option<UploadedFile>,
    pub input_type: Option<String>,
    pub input_smiles: Option<String>,
    pub input_csv: Option<UploadedFile>,
}

#[derive(Debug, Clone)]
pub enum LigandUpload {
    Smiles(String),
    Csv(UploadedFile),
}

/// A docking submission with every required piece present and checked.
#[derive(Debug, Clone)]
pub struct ValidatedDocking {
    pub experiment: String,
    pub pdb_file: UploadedFile,
    pub pdbqt_file: UploadedFile,
    pub config_file: UploadedFile,
    pub ligands: LigandUpload,
}

fn required(file: Option<UploadedFile>, what: &str) -> Result<UploadedFile> {
    file.ok_or_else(|| AgandockError::InvalidInput(format!("Missing {what}")))
}

/// Strip newlines and check the remaining characters can appear in SMILES.
pub fn clean_smiles(raw: &str) -> Result<String> {
    let smiles: String = raw.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let smiles = smiles.trim();
    if smiles.is_empty() {
        return Err(AgandockError::InvalidInput("SMILES string is empty".into()));
    }
    if !SMILES_CHARS.is_match(smiles) {
        return Err(AgandockError::InvalidInput(format!("Invalid SMILES string '{smiles}'")));
    }
    Ok(smiles.to_string())
}

impl DockingRequest {
    pub fn validate(self) -> Result<ValidatedDocking> {
        let experiment = self
            .experiment
            .ok_or_else(|| AgandockError::InvalidInput("Missing folder name".into()))?;
        validate_experiment_name(experiment.trim())?;

        let pdb_file = required(self.pdb_file, "receptor PDB file")?;
        let pdbqt_file = required(self.pdbqt_file, "receptor PDBQT file")?;
        let config_file = required(self.config_file, "docking config file")?;

        let input_type: InputType = self
            .input_type
            .as_deref()
            .ok_or_else(|| AgandockError::InvalidInput("Missing input type".into()))?
            .parse()?;

        let ligands = match input_type {
            InputType::Csv => LigandUpload::Csv(required(self.input_csv, "ligand CSV file")?),
            InputType::Smiles => {
                let raw = self
                    .input_smiles
                    .ok_or_else(|| AgandockError::InvalidInput("Missing SMILES string".into()))?;
                LigandUpload::Smiles(clean_smiles(&raw)?)
            }
        };

        Ok(ValidatedDocking {
            experiment: experiment.trim().to_string(),
            pdb_file,
            pdbqt_file,
            config_file,
            ligands,
        })
    }
}

/// Uploaded files written into the experiment folder, ready to dock.
#[derive(Debug)]
pub struct StagedDocking {
    pub job: DockingJob,
    written: Vec<PathBuf>,
}

impl StagedDocking {
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Remove the staged uploads after a failed run.
    pub async fn cleanup(&self) {
        remove_files(&self.written).await;
    }
}

async fn remove_files(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Failed to remove staged upload {:?}: {}", path, e);
        }
    }
}

async fn write_upload(dir: &Path, file: &UploadedFile, written: &mut Vec<PathBuf>) -> Result<PathBuf> {
    let path = dir.join(sanitize_filename(&file.file_name));
    tokio::fs::write(&path, &file.bytes).await?;
    debug!("Staged {:?} ({} bytes)", path, file.bytes.len());
    written.push(path.clone());
    Ok(path)
}

impl ValidatedDocking {
    /// Create `<root>/<experiment>` and write the uploads into it.
    ///
    /// A folder that already holds docking results is refused, so a rerun can
    /// neither overwrite nor (on failure) delete the inputs of a finished
    /// experiment.
    pub async fn stage(&self, root: &Path) -> Result<StagedDocking> {
        let experiment_dir = root.join(&self.experiment);
        if tokio::fs::try_exists(experiment_dir.join(RAW_FILE)).await? {
            return Err(AgandockError::InvalidInput(format!(
                "Experiment '{}' already exists, choose another folder name",
                self.experiment
            )));
        }
        tokio::fs::create_dir_all(&experiment_dir).await?;

        let mut written = Vec::new();
        let staged = async {
            let pdb_file = write_upload(&experiment_dir, &self.pdb_file, &mut written).await?;
            let pdbqt_file = write_upload(&experiment_dir, &self.pdbqt_file, &mut written).await?;
            let config_file = write_upload(&experiment_dir, &self.config_file, &mut written).await?;
            let ligands = match &self.ligands {
                LigandUpload::Smiles(smiles) => LigandInput::Smiles(smiles.clone()),
                LigandUpload::Csv(file) => {
                    LigandInput::Csv(write_upload(&experiment_dir, file, &mut written).await?)
                }
            };
            Ok::<_, AgandockError>(DockingJob {
                experiment_dir: experiment_dir.clone(),
                pdb_file,
                pdbqt_file,
                config_file,
                ligands,
            })
        }
        .await;

        match staged {
            Ok(job) => Ok(StagedDocking { job, written }),
            Err(e) => {
                remove_files(&written).await;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_request() -> DockingRequest {
        DockingRequest {
            experiment: Some("egfr".into()),
            pdb_file: Some(UploadedFile::new("receptor.pdb", "ATOM")),
            pdbqt_file: Some(UploadedFile::new("receptor.pdbqt", "ATOM")),
            config_file: Some(UploadedFile::new("config.txt", "center_x = 0")),
            input_type: Some("smiles".into()),
            input_smiles: Some("CC(=O)O\n".into()),
            input_csv: None,
        }
    }

    #[test]
    fn test_input_type_parsing() {
        assert_eq!("csv".parse::<InputType>().unwrap(), InputType::Csv);
        assert_eq!("Single SMILES".parse::<InputType>().unwrap(), InputType::Smiles);
        assert!("sdf".parse::<InputType>().is_err());
    }

    #[test]
    fn test_clean_smiles() {
        assert_eq!(clean_smiles("C1=CC=CC=C1\r\n").unwrap(), "C1=CC=CC=C1");
        assert_eq!(clean_smiles("[NH4+].C#N").unwrap(), "[NH4+].C#N");
        assert!(clean_smiles("\n").is_err());
        assert!(clean_smiles("CCO; rm -rf /").is_err());
    }

    #[test]
    fn test_validate_smiles_request() {
        let validated = complete_request().validate().unwrap();
        assert_eq!(validated.experiment, "egfr");
        assert!(matches!(validated.ligands, LigandUpload::Smiles(ref s) if s == "CC(=O)O"));
    }

    #[test]
    fn test_validate_rejects_missing_pieces() {
        let mut request = complete_request();
        request.pdbqt_file = None;
        assert!(matches!(request.validate(), Err(AgandockError::InvalidInput(_))));

        let mut request = complete_request();
        request.input_type = Some("csv".into());
        assert!(request.validate().is_err());

        let mut request = complete_request();
        request.experiment = Some("../escape".into());
        assert!(request.validate().is_err());
    }

    #[tokio::test]
    async fn test_stage_sanitizes_names() {
        let root = tempfile::tempdir().unwrap();
        let mut request = complete_request();
        request.input_type = Some("csv".into());
        request.input_csv = Some(UploadedFile::new("my ligands (v2).csv", "SMILES\nCCO\n"));
        let validated = request.validate().unwrap();

        let staged = validated.stage(root.path()).await.unwrap();
        assert_eq!(staged.written().len(), 4);
        assert_eq!(
            staged.job.ligands,
            LigandInput::Csv(root.path().join("egfr/my_ligands__v2_.csv"))
        );

        staged.cleanup().await;
        assert!(!root.path().join("egfr/receptor.pdb").exists());
        assert!(root.path().join("egfr").is_dir());
    }

    #[tokio::test]
    async fn test_stage_refuses_finished_experiment() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("egfr");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("receptor.pdb"), "ORIGINAL").unwrap();
        std::fs::write(dir.join("output.csv"), "Name\nlig_1\n").unwrap();

        let err = complete_request().validate().unwrap().stage(root.path()).await.unwrap_err();
        assert!(matches!(err, AgandockError::InvalidInput(ref msg) if msg.contains("already exists")));
        assert_eq!(std::fs::read_to_string(dir.join("receptor.pdb")).unwrap(), "ORIGINAL");
    }
}
