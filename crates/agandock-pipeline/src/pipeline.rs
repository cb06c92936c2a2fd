//! Orchestrator for the three pipeline stages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use agandock_common::{AgandockError, PipelineConfig};
use agandock_results::table::default_header_line;
use agandock_results::variant::{INTERACTION_DIR, RAW_FILE, VALIDITY_FAILED_FILE, VALIDITY_PASSED_FILE};
use agandock_results::{read_text_lossy, ScoreRange};

use crate::request::ValidatedDocking;
use crate::runner::{AgandockRunner, PlipJob};
use crate::workspace::{ExperimentWorkspace, PlipTable};
use crate::Result;

#[derive(Debug, Clone, Serialize)]
pub struct DockingOutcome {
    pub run_id: Uuid,
    pub experiment: String,
    pub command: String,
    pub stdout: String,
    /// Contents of `output.csv`
    pub raw_csv: String,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FilterOutcome {
    pub run_id: Uuid,
    pub experiment: String,
    pub command: String,
    pub passed_csv: String,
    pub failed_csv: String,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlipOutcome {
    pub run_id: Uuid,
    pub experiment: String,
    pub command: String,
    pub output_dir: PathBuf,
    pub tables: Vec<PlipTable>,
    pub finished_at: DateTime<Utc>,
}

pub struct DockingPipeline {
    workspace: ExperimentWorkspace,
    runner: AgandockRunner,
}

impl DockingPipeline {
    pub fn new(workspace: ExperimentWorkspace, runner: AgandockRunner) -> Self {
        Self { workspace, runner }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            ExperimentWorkspace::new(&config.workspace_root),
            AgandockRunner::from_config(config),
        )
    }

    pub fn workspace(&self) -> &ExperimentWorkspace {
        &self.workspace
    }

    async fn receptor(&self, experiment: &str) -> Result<PathBuf> {
        self.workspace
            .find_receptor_pdb(experiment)
            .await?
            .ok_or_else(|| AgandockError::InvalidInput("No PDB file found in experiment folder".into()))
    }

    /// Stage the uploads and dock. Uploads are removed again if the run fails.
    pub async fn dock(&self, request: &ValidatedDocking) -> Result<DockingOutcome> {
        let run_id = Uuid::new_v4();
        info!("Docking run {} for {}", run_id, request.experiment);

        let staged = request.stage(self.workspace.root()).await?;
        let output = match self.runner.run_docking(&staged.job).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Docking run {} failed, removing uploads", run_id);
                staged.cleanup().await;
                return Err(e);
            }
        };

        let raw_path = staged.job.experiment_dir.join(RAW_FILE);
        let raw_csv = read_text_lossy(&raw_path).await.map_err(|e| {
            AgandockError::ExternalTool(format!("Docking finished without {}: {}", RAW_FILE, e))
        })?;

        Ok(DockingOutcome {
            run_id,
            experiment: request.experiment.clone(),
            command: output.command,
            stdout: output.stdout,
            raw_csv,
            finished_at: Utc::now(),
        })
    }

    /// PoseBusters validity filtering of the docked poses within `range`.
    pub async fn filter(&self, experiment: &str, range: &ScoreRange) -> Result<FilterOutcome> {
        let run_id = Uuid::new_v4();
        let dir = self.workspace.experiment_dir(experiment)?;
        let receptor = self.receptor(experiment).await?;
        info!("Filter run {} for {}", run_id, experiment);

        let output = self.runner.run_filter(&dir, range, &receptor).await?;

        let passed_csv = read_text_lossy(&dir.join(VALIDITY_PASSED_FILE))
            .await
            .map_err(|e| {
                AgandockError::ExternalTool(format!(
                    "Filtering finished without {}: {}",
                    VALIDITY_PASSED_FILE, e
                ))
            })?;
        // Absent when every pose passed.
        let failed_csv = read_text_lossy(&dir.join(VALIDITY_FAILED_FILE))
            .await
            .unwrap_or_else(|_| default_header_line());

        Ok(FilterOutcome {
            run_id,
            experiment: experiment.to_string(),
            command: output.command,
            passed_csv,
            failed_csv,
            finished_at: Utc::now(),
        })
    }

    /// PLIP interaction analysis, optionally over the validity-passed poses
    /// and/or a score range only.
    pub async fn analyse_interactions(
        &self,
        experiment: &str,
        use_pb_filtered_ligands: bool,
        range: Option<ScoreRange>,
    ) -> Result<PlipOutcome> {
        let run_id = Uuid::new_v4();
        let dir = self.workspace.experiment_dir(experiment)?;
        if use_pb_filtered_ligands && !self.workspace.has_validity_results(experiment).await? {
            return Err(AgandockError::InvalidInput(
                "PoseBusters results are required before analysing filtered ligands".into(),
            ));
        }
        let receptor = self.receptor(experiment).await?;
        info!("PLIP run {} for {}", run_id, experiment);

        let job = PlipJob {
            experiment_dir: dir.clone(),
            receptor,
            use_pb_filtered_ligands,
            range,
        };
        let output = self.runner.run_plip(&job).await?;
        let tables = self.workspace.plip_tables(experiment).await.unwrap_or_default();

        Ok(PlipOutcome {
            run_id,
            experiment: experiment.to_string(),
            command: output.command,
            output_dir: dir.join(INTERACTION_DIR),
            tables,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::request::{DockingRequest, UploadedFile};
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    // Stand-in CLI: writes the files each stage would produce into $2.
    const FAKE_CLI: &str = r#"#!/bin/sh
case "$1" in
  run_docking)
    printf 'Name,SMILES,Docking score (kcal/mol),Ligand efficiency\nlig_1,CCO,-7.2,0.3\n' > "$2/output.csv" ;;
  run_filter)
    printf 'Name,SMILES,Docking score (kcal/mol),Ligand efficiency\nlig_1,CCO,-7.2,0.3\n' > "$2/output_with_pb.csv" ;;
  run_plip)
    mkdir -p "$2/output_plip_files"
    printf 'Name,Residue\nlig_1,ASP831\n' > "$2/output_plip_files/hydrogen_bonds.csv" ;;
esac
"#;

    fn setup(cli_body: &str) -> (TempDir, DockingPipeline) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("workspace");
        std::fs::create_dir_all(&root).unwrap();
        let cli = dir.path().join("agandock");
        std::fs::write(&cli, cli_body).unwrap();
        std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755)).unwrap();
        let pipeline = DockingPipeline::new(
            ExperimentWorkspace::new(&root),
            AgandockRunner::new(&cli).with_working_dir(&root),
        );
        (dir, pipeline)
    }

    fn request() -> ValidatedDocking {
        DockingRequest {
            experiment: Some("egfr".into()),
            pdb_file: Some(UploadedFile::new("receptor.pdb", "ATOM")),
            pdbqt_file: Some(UploadedFile::new("receptor.pdbqt", "ATOM")),
            config_file: Some(UploadedFile::new("config.txt", "size_x = 20")),
            input_type: Some("smiles".into()),
            input_smiles: Some("CCO".into()),
            input_csv: None,
        }
        .validate()
        .unwrap()
    }

    fn root(pipeline: &DockingPipeline) -> &Path {
        pipeline.workspace().root()
    }

    #[tokio::test]
    async fn test_full_run() {
        let (_dir, pipeline) = setup(FAKE_CLI);

        let docked = pipeline.dock(&request()).await.unwrap();
        assert!(docked.raw_csv.contains("lig_1"));
        assert!(docked.command.contains("Single SMILES"));

        let range = ScoreRange::new(-10.0, 0.0).unwrap();
        let filtered = pipeline.filter("egfr", &range).await.unwrap();
        assert!(filtered.passed_csv.contains("lig_1"));
        assert_eq!(filtered.failed_csv, default_header_line());

        let plip = pipeline.analyse_interactions("egfr", true, Some(range)).await.unwrap();
        assert_eq!(plip.tables.len(), 1);
        assert_eq!(plip.tables[0].display_name, "Hydrogen Bonds");
    }

    #[tokio::test]
    async fn test_failed_docking_removes_uploads() {
        let (_dir, pipeline) = setup("#!/bin/sh\necho 'Vina crashed' >&2\nexit 1\n");
        let err = pipeline.dock(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Vina crashed");
        assert!(!root(&pipeline).join("egfr/receptor.pdb").exists());
    }

    #[tokio::test]
    async fn test_redocking_keeps_finished_experiment() {
        let (_dir, pipeline) = setup(FAKE_CLI);
        pipeline.dock(&request()).await.unwrap();
        let before = std::fs::read_to_string(root(&pipeline).join("egfr/output.csv")).unwrap();

        assert!(matches!(
            pipeline.dock(&request()).await,
            Err(AgandockError::InvalidInput(_))
        ));
        assert!(root(&pipeline).join("egfr/receptor.pdb").exists());
        assert_eq!(std::fs::read_to_string(root(&pipeline).join("egfr/output.csv")).unwrap(), before);
    }

    #[tokio::test]
    async fn test_filter_outputs_tolerate_invalid_utf8() {
        let cli = "#!/bin/sh\nprintf 'Name,Docking score (kcal/mol)\\nCaf\\351ine,-7.0\\n' > \"$2/output_with_pb.csv\"\n";
        let (_dir, pipeline) = setup(cli);
        let exp = root(&pipeline).join("egfr");
        std::fs::create_dir_all(&exp).unwrap();
        std::fs::write(exp.join("receptor.pdb"), "ATOM").unwrap();

        let range = ScoreRange::new(-10.0, 0.0).unwrap();
        let filtered = pipeline.filter("egfr", &range).await.unwrap();
        assert!(filtered.passed_csv.contains("Caf\u{fffd}ine,-7.0"));
    }

    #[tokio::test]
    async fn test_filter_without_receptor() {
        let (_dir, pipeline) = setup(FAKE_CLI);
        std::fs::create_dir_all(root(&pipeline).join("empty")).unwrap();
        let range = ScoreRange::new(-10.0, 0.0).unwrap();
        assert!(matches!(
            pipeline.filter("empty", &range).await,
            Err(AgandockError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_plip_on_filtered_requires_validity_results() {
        let (_dir, pipeline) = setup(FAKE_CLI);
        pipeline.dock(&request()).await.unwrap();
        assert!(matches!(
            pipeline.analyse_interactions("egfr", true, None).await,
            Err(AgandockError::InvalidInput(_))
        ));
    }
}
