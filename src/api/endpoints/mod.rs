//! API endpoint handlers.

pub mod generate;
pub mod health;
pub mod summary;

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;
use crate::pipeline::in_flight::{InFlightGuard, InFlightRegistry, RequestKind};

/// Header the wizard uses to identify its session.
pub const SESSION_HEADER: &str = "x-session-id";

/// Method fallback for every route.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Session id from `x-session-id`, if present and non-blank.
pub(crate) fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Claim the session's slot or fail with 409.
///
/// Move the guard into the blocking model call: the slot must outlive the
/// handler when the client disconnects mid-call.
pub(crate) fn acquire(
    registry: &Arc<InFlightRegistry>,
    session_id: &str,
    kind: RequestKind,
) -> Result<InFlightGuard, ApiError> {
    registry.try_acquire(session_id, kind)?.ok_or(ApiError::Busy(kind))
}

/// An unreadable body counts as `{}`.
pub(crate) fn lenient_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, len = body.len(), "Unreadable request body, treating as empty");
            T::default()
        }
    }
}
