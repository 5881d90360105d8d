//! Edit route - structured edits on an existing document.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use doctrans_core::EditSpec;

use crate::helpers::RouteResult;
use crate::identity::resolve_owner;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DocumentEditResponse {
    pub version_id: String,
    pub download_url: String,
    /// Operations that took effect, in application order
    pub applied: Vec<String>,
    /// Operations that found nothing to do (best-effort contract)
    pub skipped: Vec<String>,
}

/// Apply an [`EditSpec`] to the latest version of a document and persist
/// the result as a new version.
pub async fn edit_document(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<String>,
    headers: HeaderMap,
    Json(spec): Json<EditSpec>,
) -> RouteResult<Json<DocumentEditResponse>> {
    let owner_id = resolve_owner(&state, &headers)?;
    info!(%owner_id, %document_id, "edit request accepted");

    let outcome = state
        .pipeline
        .edit_document(&owner_id, &document_id, spec)
        .await?;

    Ok(Json(DocumentEditResponse {
        version_id: outcome.version.id.clone(),
        download_url: outcome.version.download_path(),
        applied: outcome.applied,
        skipped: outcome.skipped,
    }))
}
