use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::Database;
use crate::error::DispatchError;
use crate::ingest::{Dispatcher, IngestRequest, SourceFormat};
use crate::models::*;

/// Header carrying the opaque identity of whoever uploads a list.
pub const UPLOADED_BY_HEADER: &str = "x-uploaded-by";

// ============================================================
// Error Handling
// ============================================================

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
}

/// Log a store error and return a sanitized response to the client.
///
/// Agent validation failures ("Invalid ...", "... already exists") are safe
/// to expose and come back as BAD_REQUEST.
fn internal_error(e: impl std::fmt::Display) -> ApiError {
    let msg = e.to_string();

    if msg.starts_with("Invalid") || msg.contains("already exists") {
        tracing::warn!("Validation error: {}", msg);
        return error_body(StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Malformed query strings and JSON bodies come back in the usual error shape.
fn rejection_error(body_text: String) -> ApiError {
    tracing::warn!("Rejected request: {}", body_text);
    error_body(StatusCode::BAD_REQUEST, body_text)
}

fn agent_not_found() -> ApiError {
    error_body(StatusCode::NOT_FOUND, "Agent not found")
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Lists
// ============================================================

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

/// Accepts the raw file bytes as the request body.
pub async fn upload_list(
    State(dispatcher): State<Dispatcher<Database>>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ListDetail>), Response> {
    let Query(query) =
        query.map_err(|rejection| rejection_error(rejection.body_text()).into_response())?;

    let uploaded_by = headers
        .get(UPLOADED_BY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            tracing::warn!("Upload rejected: missing uploader header");
            error_body(StatusCode::BAD_REQUEST, "Missing X-Uploaded-By header").into_response()
        })?;

    let format = SourceFormat::from_file_name(&query.file_name).ok_or_else(|| {
        DispatchError::UnsupportedFileType(query.file_name.clone()).into_response()
    })?;

    tracing::debug!(
        file_name = %query.file_name,
        bytes = body.len(),
        "Received upload"
    );

    dispatcher
        .ingest(IngestRequest {
            payload: &body,
            format,
            file_name: &query.file_name,
            uploaded_by,
        })
        .map(|detail| (StatusCode::CREATED, Json(detail)))
        .map_err(IntoResponse::into_response)
}

pub async fn list_lists(
    State(dispatcher): State<Dispatcher<Database>>,
) -> Result<Json<Vec<ListSummary>>, DispatchError> {
    dispatcher.list_summaries().map(Json)
}

pub async fn get_list(
    State(dispatcher): State<Dispatcher<Database>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ListDetail>, DispatchError> {
    dispatcher.get_detail(id).map(Json)
}

// ============================================================
// Agents
// ============================================================

pub async fn list_agents(State(db): State<Database>) -> Result<Json<Vec<Agent>>, ApiError> {
    db.get_all_agents().map(Json).map_err(internal_error)
}

pub async fn get_agent(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Agent>, ApiError> {
    db.get_agent(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(agent_not_found)
}

pub async fn create_agent(
    State(db): State<Database>,
    input: Result<Json<CreateAgentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let Json(input) = input.map_err(|rejection| rejection_error(rejection.body_text()))?;
    db.create_agent(input)
        .map(|agent| (StatusCode::CREATED, Json(agent)))
        .map_err(internal_error)
}

pub async fn update_agent(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    input: Result<Json<UpdateAgentInput>, JsonRejection>,
) -> Result<Json<Agent>, ApiError> {
    let Json(input) = input.map_err(|rejection| rejection_error(rejection.body_text()))?;
    db.update_agent(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(agent_not_found)
}

pub async fn delete_agent(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if db.delete_agent(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(agent_not_found())
    }
}
