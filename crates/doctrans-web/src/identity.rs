//! Caller identity at the boundary.
//!
//! Authentication itself is an external collaborator; this service only
//! consumes the identity it presents. A bearer token is treated as an
//! opaque owner id supplied by that collaborator. The anonymous fallback
//! exists for demo deployments and must be enabled explicitly.

use axum::http::HeaderMap;

use crate::helpers::ApiError;
use crate::state::AppState;

/// Owner id used when anonymous access is allowed and no identity is
/// presented. Mirrors the original system's default owner.
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Resolve the caller's owner id from request headers.
///
/// Returns 401 when no identity is presented and the deployment does not
/// allow anonymous callers.
pub fn resolve_owner(state: &AppState, headers: &HeaderMap) -> Result<String, ApiError> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Ok(token.to_string()),
        None if state.allow_anonymous => Ok(ANONYMOUS_OWNER.to_string()),
        None => Err(ApiError::unauthorized(
            "missing bearer identity and anonymous access is disabled",
        )),
    }
}
