//! Translate route - document upload and translation.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use axum_extra::extract::Multipart;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use doctrans_core::{FileType, Lang, TranslateRequest};

use crate::helpers::{ApiError, RouteResult};
use crate::identity::resolve_owner;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DocumentVersionResponse {
    pub id: String,
    pub document_id: String,
    pub version_id: String,
    pub download_url: String,
    /// Detected source language of the upload ("auto" when unknown)
    pub source_language: String,
    /// False when the translation backend was unavailable and the
    /// artifact carries the original text (passthrough fallback)
    pub translated: bool,
}

/// Upload a document and translate it into the requested language.
///
/// Multipart form: `file` (the document) and `target_language` (ISO code,
/// defaults to the server's configured target). The workflow runs on the
/// background queue; the request resolves when processing completes.
pub async fn translate_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> RouteResult<Json<DocumentVersionResponse>> {
    let owner_id = resolve_owner(&state, &headers)?;

    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut target_language: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let data = field.bytes().await.map_err(|e| {
                    ApiError::bad_request("UPLOAD_INVALID", format!("unreadable upload: {e}"))
                })?;
                file = Some((filename, data));
            }
            "target_language" => {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request("UPLOAD_INVALID", format!("unreadable field: {e}"))
                })?;
                target_language = Some(value);
            }
            _ => {}
        }
    }

    let (filename, data) = file
        .ok_or_else(|| ApiError::bad_request("UPLOAD_INVALID", "missing `file` field"))?;
    let file_type = FileType::from_filename(&filename).ok_or_else(|| {
        ApiError::bad_request(
            "UNSUPPORTED_FILE_TYPE",
            format!("unsupported file type for {filename:?}; expected pdf, jpg, jpeg, or png"),
        )
    })?;
    let target_lang = target_language
        .filter(|l| !l.trim().is_empty())
        .map_or_else(|| Lang::new(doctrans_core::DEFAULT_TARGET_LANG), Lang::new);

    info!(%owner_id, filename, %file_type, %target_lang, "translate request accepted");

    let request = TranslateRequest {
        owner_id,
        filename,
        bytes: data,
        file_type,
        target_lang,
    };

    // Submitting through the queue gives the workflow transient-failure
    // retries without holding a worker thread
    let outcome = state.queue.submit(request).wait().await?;

    Ok(Json(DocumentVersionResponse {
        id: outcome.version.id.clone(),
        document_id: outcome.document.id.clone(),
        version_id: outcome.version.id.clone(),
        download_url: outcome.version.download_path(),
        source_language: outcome.source_lang.to_string(),
        translated: outcome.translated,
    }))
}
