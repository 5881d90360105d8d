//! Download route - decrypted version content as a binary attachment.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use std::sync::Arc;

use crate::helpers::{ApiError, RouteResult};
use crate::state::AppState;

/// Stream a version's decrypted bytes.
///
/// The content type comes from the owning document's file type; the
/// payload is a standalone PDF or image file once decrypted.
pub async fn download_version(
    State(state): State<Arc<AppState>>,
    Path(version_id): Path<String>,
) -> RouteResult<Response> {
    let version = state
        .pipeline
        .storage()
        .get_version_by_id(&version_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("version {version_id}")))?;

    let download_name = format!("translated_{}.{}", version.id, version.file_type.as_str());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, version.file_type.mime_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{download_name}\""),
        )
        .body(Body::from(version.content))
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "RESPONSE_BUILD_FAILED",
                e.to_string(),
            )
        })
}
