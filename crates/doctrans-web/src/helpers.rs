//! Error mapping for route handlers.
//!
//! Core errors cross the boundary as `{error_code, detail}` JSON, the
//! pair clients branch on. The HTTP status is derived from the stable
//! error code, not the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use doctrans_core::Error;

/// Wire format for every failure leaving this service.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub detail: String,
}

/// Route-level error carrying the structured response.
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &str, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error_code: error_code.to_string(),
                detail: detail.into(),
            },
        }
    }

    pub fn bad_request(error_code: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_code, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", detail)
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            // The caller's input was unusable
            Error::Extraction(_) | Error::Ocr(_) | Error::Edit(_) => StatusCode::BAD_REQUEST,
            // Everything else is on us
            _ => {
                tracing::error!(code = err.code(), detail = %err, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, ApiError>;
