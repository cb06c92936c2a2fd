use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgandockError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A result table or folder that no pipeline stage has produced yet.
    #[error("Not yet available: {0}")]
    NotAvailable(String),

    /// The external `agandock` tool exited unsuccessfully. Carries its stderr verbatim.
    #[error("{0}")]
    ExternalTool(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AgandockError>;

/// Error type returned by JSON API handlers.
#[derive(Debug)]
pub struct ApiError(pub AgandockError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AgandockError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AgandockError::NotAvailable(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E: Into<AgandockError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("API error: {}", self.0);
        }
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}
