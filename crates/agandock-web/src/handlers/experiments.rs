//! Experiment folder queries.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use agandock_common::{AgandockError, ApiError};
use agandock_pipeline::PlcFiles;
use agandock_results::{ResultSource, ResultVariant};

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct ExperimentDetail {
    pub name: String,
    /// `output.csv`
    pub raw: String,
    /// `output_with_pb.csv`, once PoseBusters has run
    pub validity_passed: Option<String>,
}

/// GET /api/experiments
pub async fn api_experiments(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let experiments = state.pipeline.workspace().list_experiments().await?;
    Ok(Json(json!({ "experiments": experiments })))
}

/// GET /api/experiments/{name} - raw and validity-passed CSV text.
pub async fn api_experiment_detail(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<ExperimentDetail>, ApiError> {
    let raw = state
        .source
        .fetch(&name, &ResultVariant::Raw)
        .await?
        .ok_or_else(|| AgandockError::NotAvailable(format!("No docking results for '{name}'")))?;
    let validity_passed = state.source.fetch(&name, &ResultVariant::ValidityPassed).await?;
    Ok(Json(ExperimentDetail { name, raw, validity_passed }))
}

/// GET /api/check-pdb/{name} - receptor PDB used by the filter and PLIP stages.
pub async fn api_check_pdb(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let receptor = state.pipeline.workspace().find_receptor_pdb(&name).await?;
    Ok(Json(json!({
        "exists": receptor.is_some(),
        "path": receptor.map(|p| p.display().to_string()),
    })))
}

/// GET /api/check-pb/{name}
pub async fn api_check_pb(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let exists = state.pipeline.workspace().has_validity_results(&name).await?;
    Ok(Json(json!({ "exists": exists })))
}

/// GET /api/plc/{name} - protein-ligand complexes written by PLIP.
pub async fn api_plc_files(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<PlcFiles>, ApiError> {
    Ok(Json(state.pipeline.workspace().plc_files(&name).await?))
}
