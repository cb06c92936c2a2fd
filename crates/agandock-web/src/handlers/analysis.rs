//! PoseBusters filtering and PLIP interaction analysis.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use agandock_common::{AgandockError, ApiError};
use agandock_pipeline::{FilterOutcome, PlipOutcome, PlipTable};
use agandock_results::{ResultVariant, ScoreRange};

use crate::state::{AppEvent, SharedState};

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub folder_name: String,
    pub lower_range: f64,
    pub higher_range: f64,
}

#[derive(Debug, Deserialize)]
pub struct PlipRequest {
    pub folder_name: String,
    pub lower_range: Option<f64>,
    pub higher_range: Option<f64>,
    #[serde(default)]
    pub use_pb_filtered_ligands: bool,
}

impl PlipRequest {
    /// Both ends or neither.
    fn range(&self) -> Result<Option<ScoreRange>, AgandockError> {
        match (self.lower_range, self.higher_range) {
            (Some(lower), Some(upper)) => ScoreRange::new(lower, upper).map(Some),
            (None, None) => Ok(None),
            _ => Err(AgandockError::InvalidInput(
                "Provide both lower_range and higher_range, or neither".into(),
            )),
        }
    }
}

/// POST /api/filter
pub async fn api_filter(
    State(state): State<SharedState>,
    Json(payload): Json<FilterRequest>,
) -> Result<Json<FilterOutcome>, ApiError> {
    let range = ScoreRange::new(payload.lower_range, payload.higher_range)?;
    let experiment = payload.folder_name;

    state.status("filter", &experiment, format!("PoseBusters filtering {experiment}"));
    let outcome = match state.pipeline.filter(&experiment, &range).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.status("filter_failed", &experiment, e.to_string());
            return Err(e.into());
        }
    };

    state.cache.invalidate_experiment(&experiment).await;
    let passed = state
        .cache
        .store(&experiment, &ResultVariant::ValidityPassed, &outcome.passed_csv)
        .await;
    let failed = state
        .cache
        .store(&experiment, &ResultVariant::ValidityFailed, &outcome.failed_csv)
        .await;

    state.emit(AppEvent::FilterComplete {
        run_id: outcome.run_id,
        experiment,
        passed: passed.len(),
        failed: failed.len(),
    });
    Ok(Json(outcome))
}

/// POST /api/plip
pub async fn api_plip(
    State(state): State<SharedState>,
    Json(payload): Json<PlipRequest>,
) -> Result<Json<PlipOutcome>, ApiError> {
    let range = payload.range()?;
    let experiment = payload.folder_name;

    state.status("plip", &experiment, format!("PLIP analysis of {experiment}"));
    let outcome = match state
        .pipeline
        .analyse_interactions(&experiment, payload.use_pb_filtered_ligands, range)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            state.status("plip_failed", &experiment, e.to_string());
            return Err(e.into());
        }
    };

    state.cache.invalidate_experiment(&experiment).await;
    state.emit(AppEvent::PlipComplete {
        run_id: outcome.run_id,
        experiment,
        tables: outcome.tables.len(),
    });
    Ok(Json(outcome))
}

/// GET /api/plip/{name}/tables
pub async fn api_plip_tables(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<PlipTable>>, ApiError> {
    Ok(Json(state.pipeline.workspace().plip_tables(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct ReportParams {
    pub pdb: String,
}

/// GET /api/plip/{name}/report?pdb=
pub async fn api_plip_report(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(params): Query<ReportParams>,
) -> Result<Json<Value>, ApiError> {
    let interactions = state.pipeline.workspace().plip_report(&name, &params.pdb).await?;
    Ok(Json(json!({ "interactions": interactions })))
}
