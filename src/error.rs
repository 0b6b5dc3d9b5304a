use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

/// Failures decoding an uploaded payload in its declared format.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid spreadsheet: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("spreadsheet contains no sheets")]
    NoSheet,

    #[error("file has no header row")]
    MissingHeader,
}

/// Errors surfaced by ingest and list lookups.
///
/// Everything except `Store` is a client-side problem and leaves the store
/// untouched.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("unsupported file type '{0}': only CSV, XLSX, and XLS files are allowed")]
    UnsupportedFileType(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no valid data found in file; rows need both FirstName and Phone values")]
    NoValidRecords,

    #[error("no active agents found; add agents before uploading")]
    NoAgents,

    #[error("list not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedFileType(_)
            | Self::Parse(_)
            | Self::NoValidRecords
            | Self::NoAgents => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Store(err) => {
                tracing::error!("Store error: {:#}", err);
                "Internal server error".to_string()
            }
            other => {
                tracing::warn!("Rejected request: {}", other);
                other.to_string()
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
