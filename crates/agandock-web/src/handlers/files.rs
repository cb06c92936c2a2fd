//! Raw file access inside the workspace, for the structure viewer.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use agandock_common::ApiError;

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct FileParams {
    pub path: String,
}

/// GET /api/file?path=
pub async fn api_file(
    State(state): State<SharedState>,
    Query(params): Query<FileParams>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state.pipeline.workspace().read_workspace_file(&params.path).await?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], content))
}
