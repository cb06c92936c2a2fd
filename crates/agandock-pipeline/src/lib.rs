//! AGanDock pipeline - everything that touches the external `agandock` CLI.
//!
//! The CLI does the heavy lifting in three stages, each writing into an
//! experiment folder under the workspace root:
//! 1. `run_docking`: docks ligands against a receptor (`output.csv`)
//! 2. `run_filter`: PoseBusters validity filtering (`output_with_pb.csv`, `output_without_pb.csv`)
//! 3. `run_plip`: PLIP interaction analysis (`plc/`, `output_plip_files/`)
//!
//! This crate validates requests, stages uploads, invokes the CLI and reads
//! back what it produced.

pub mod request;
pub mod runner;
pub mod workspace;
pub mod pipeline;

pub use pipeline::{DockingOutcome, DockingPipeline, FilterOutcome, PlipOutcome};
pub use request::{DockingRequest, InputType, StagedDocking, UploadedFile, ValidatedDocking};
pub use runner::{AgandockRunner, CommandOutput, DockingJob, LigandInput, PlipJob};
pub use workspace::{ExperimentWorkspace, PlcFiles, PlipTable};

pub type Result<T> = agandock_common::Result<T>;
