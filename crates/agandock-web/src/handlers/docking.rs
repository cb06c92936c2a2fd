//! Docking submission.

use axum::{
    extract::{Multipart, State},
    Json,
};
use tracing::info;

use agandock_common::{AgandockError, ApiError};
use agandock_pipeline::{DockingOutcome, DockingRequest, UploadedFile};
use agandock_results::ResultVariant;

use crate::state::{AppEvent, SharedState};

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AgandockError {
    AgandockError::InvalidInput(format!("Malformed upload: {e}"))
}

/// Collect the form fields into a [`DockingRequest`]. Unknown fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<DockingRequest, AgandockError> {
    let mut request = DockingRequest::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        match name.as_str() {
            "folderName" => request.experiment = Some(field.text().await.map_err(multipart_error)?),
            "inputType" => request.input_type = Some(field.text().await.map_err(multipart_error)?),
            "inputSmiles" => request.input_smiles = Some(field.text().await.map_err(multipart_error)?),
            "pdbFile" | "pdbqtFile" | "configFile" | "inputCsv" => {
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part for an untouched file input.
                if bytes.is_empty() && file_name.as_deref().unwrap_or("").is_empty() {
                    continue;
                }
                let upload = UploadedFile::new(file_name.unwrap_or_else(|| name.clone()), bytes.to_vec());
                match name.as_str() {
                    "pdbFile" => request.pdb_file = Some(upload),
                    "pdbqtFile" => request.pdbqt_file = Some(upload),
                    "configFile" => request.config_file = Some(upload),
                    _ => request.input_csv = Some(upload),
                }
            }
            _ => {}
        }
    }
    Ok(request)
}

/// POST /api/docking (multipart)
pub async fn api_docking(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<DockingOutcome>, ApiError> {
    let request = read_form(multipart).await?.validate()?;
    let experiment = request.experiment.clone();

    state.status("docking", &experiment, format!("Docking started for {experiment}"));
    let outcome = match state.pipeline.dock(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            state.status("docking_failed", &experiment, e.to_string());
            return Err(e.into());
        }
    };

    state.cache.invalidate_experiment(&experiment).await;
    let table = state.cache.store(&experiment, &ResultVariant::Raw, &outcome.raw_csv).await;
    info!("Docking run {} produced {} rows", outcome.run_id, table.len());

    state.emit(AppEvent::DockingComplete {
        run_id: outcome.run_id,
        experiment,
        ligands: table.len(),
    });
    Ok(Json(outcome))
}
