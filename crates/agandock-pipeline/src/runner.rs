//! Wrapper around the `agandock` command-line tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use agandock_common::{AgandockError, PipelineConfig};
use agandock_results::ScoreRange;

use crate::Result;

/// Ligands for a docking run.
#[derive(Debug, Clone, PartialEq)]
pub enum LigandInput {
    /// A single SMILES string
    Smiles(String),
    /// A CSV of SMILES on disk
    Csv(PathBuf),
}

impl LigandInput {
    /// The `--input_type` value the CLI expects.
    pub fn input_type(&self) -> &'static str {
        match self {
            LigandInput::Smiles(_) => "Single SMILES",
            LigandInput::Csv(_) => "Multiple SMILES",
        }
    }
}

/// Configuration for a docking run.
#[derive(Debug, Clone)]
pub struct DockingJob {
    pub experiment_dir: PathBuf,
    pub pdb_file: PathBuf,
    pub pdbqt_file: PathBuf,
    pub config_file: PathBuf,
    pub ligands: LigandInput,
}

/// Configuration for a PLIP interaction analysis run.
#[derive(Debug, Clone)]
pub struct PlipJob {
    pub experiment_dir: PathBuf,
    pub receptor: PathBuf,
    pub use_pb_filtered_ligands: bool,
    pub range: Option<ScoreRange>,
}

/// Captured output of a successful CLI run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// The command line, for display
    pub command: String,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `agandock` subcommands. Arguments are passed as an argument vector,
/// never through a shell.
#[derive(Debug, Clone)]
pub struct AgandockRunner {
    executable_path: PathBuf,
    working_dir: Option<PathBuf>,
}

impl AgandockRunner {
    /// Create a new AgandockRunner.
    pub fn new<P: AsRef<Path>>(executable_path: P) -> Self {
        Self {
            executable_path: executable_path.as_ref().to_path_buf(),
            working_dir: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.cli_path).with_working_dir(config.working_dir())
    }

    pub fn with_working_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// `run_docking <dir> --pdb_file .. --pdbqt_file .. --config_file .. --input_type .. (--input_csv | --input_smiles) ..`
    pub fn docking_args(job: &DockingJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "run_docking".into(),
            job.experiment_dir.clone().into(),
            "--pdb_file".into(),
            job.pdb_file.clone().into(),
            "--pdbqt_file".into(),
            job.pdbqt_file.clone().into(),
            "--config_file".into(),
            job.config_file.clone().into(),
            "--input_type".into(),
            job.ligands.input_type().into(),
        ];
        match &job.ligands {
            LigandInput::Csv(path) => {
                args.push("--input_csv".into());
                args.push(path.clone().into());
            }
            LigandInput::Smiles(smiles) => {
                args.push("--input_smiles".into());
                args.push(smiles.into());
            }
        }
        args
    }

    /// `run_filter <dir> <lower> <upper> --pdb_file <receptor>`
    pub fn filter_args(experiment_dir: &Path, range: &ScoreRange, receptor: &Path) -> Vec<OsString> {
        vec![
            "run_filter".into(),
            experiment_dir.into(),
            range.lower().to_string().into(),
            range.upper().to_string().into(),
            "--pdb_file".into(),
            receptor.into(),
        ]
    }

    /// `run_plip <dir> --pdb_file <receptor> [--use_pb_filtered_ligands] [--lower_range L --higher_range H]`
    pub fn plip_args(job: &PlipJob) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "run_plip".into(),
            job.experiment_dir.clone().into(),
            "--pdb_file".into(),
            job.receptor.clone().into(),
        ];
        if job.use_pb_filtered_ligands {
            args.push("--use_pb_filtered_ligands".into());
        }
        if let Some(range) = &job.range {
            args.push("--lower_range".into());
            args.push(range.lower().to_string().into());
            args.push("--higher_range".into());
            args.push(range.upper().to_string().into());
        }
        args
    }

    pub async fn run_docking(&self, job: &DockingJob) -> Result<CommandOutput> {
        info!("Running docking for {:?}", job.experiment_dir);
        self.execute(Self::docking_args(job)).await
    }

    pub async fn run_filter(&self, experiment_dir: &Path, range: &ScoreRange, receptor: &Path) -> Result<CommandOutput> {
        info!(
            "Running PoseBusters filter on {:?} for {} to {}",
            experiment_dir,
            range.lower(),
            range.upper()
        );
        self.execute(Self::filter_args(experiment_dir, range, receptor)).await
    }

    pub async fn run_plip(&self, job: &PlipJob) -> Result<CommandOutput> {
        info!("Running PLIP analysis on {:?}", job.experiment_dir);
        self.execute(Self::plip_args(job)).await
    }

    /// Command line as it would be typed, for logs and the UI.
    pub fn render_command(&self, args: &[OsString]) -> String {
        std::iter::once(self.executable_path.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|arg| {
                let arg = arg.to_string_lossy();
                if arg.is_empty() || arg.contains(char::is_whitespace) || arg.contains('"') {
                    format!("\"{}\"", arg.replace('"', "\\\""))
                } else {
                    arg.into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn execute(&self, args: Vec<OsString>) -> Result<CommandOutput> {
        let command_line = self.render_command(&args);
        debug!("Executing: {}", command_line);

        let mut command = Command::new(&self.executable_path);
        command.args(&args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output().await.map_err(|e| {
            AgandockError::ExternalTool(format!(
                "Failed to start {}: {}",
                self.executable_path.display(),
                e
            ))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!("{} failed with {}", command_line, output.status);
            let message = if stderr.trim().is_empty() {
                format!("{} exited with {}", command_line, output.status)
            } else {
                stderr.trim_end().to_string()
            };
            return Err(AgandockError::ExternalTool(message));
        }

        if !stderr.trim().is_empty() {
            debug!("agandock stderr: {}", stderr.trim_end());
        }
        debug!("agandock completed successfully");

        Ok(CommandOutput {
            command: command_line,
            stdout,
            stderr,
        })
    }
}
