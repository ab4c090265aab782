//! Axum route handlers for the editing-session API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::document::Edit;
use crate::errors::AppError;
use crate::preview::ResumePreview;
use crate::session::{EditBatchResult, SessionSnapshot};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    /// Initial résumé. Omitted or `null` opens a blank document.
    #[serde(default)]
    pub document: Value,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub edits: Vec<Edit>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/documents
pub async fn handle_create_document(
    State(state): State<AppState>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    if !(request.document.is_object() || request.document.is_null()) {
        return Err(AppError::Validation(
            "document must be a JSON object".to_string(),
        ));
    }

    let snapshot = state.sessions.create(request.document).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(state.sessions.get(id).await?))
}

/// DELETE /api/v1/documents/:id
pub async fn handle_close_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.close(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/documents/:id/edits
///
/// Applies the edits in order. An edit that does not resolve against the document is
/// reported as `ignored` in its outcome; the request itself still succeeds.
pub async fn handle_apply_edits(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EditRequest>,
) -> Result<Json<EditBatchResult>, AppError> {
    if request.edits.is_empty() {
        return Err(AppError::Validation("edits cannot be empty".to_string()));
    }

    Ok(Json(state.sessions.apply(id, request.edits).await?))
}

/// GET /api/v1/documents/:id/preview
pub async fn handle_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResumePreview>, AppError> {
    Ok(Json(state.sessions.preview(id).await?))
}
