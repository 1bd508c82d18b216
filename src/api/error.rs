//! API error types with the JSON bodies the browser client expects.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::in_flight::{InFlightError, RequestKind};
use crate::pipeline::summary::SummaryError;

/// `{ "error": ..., "details"?: ... }`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("{0}")]
    BadRequest(String),
    #[error("Missing {0}")]
    MissingCredential(&'static str),
    #[error("AI connection error: {0}")]
    AiConnection(String),
    #[error("{}", .0.busy_message())]
    Busy(RequestKind),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
                None,
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, None),
            ApiError::MissingCredential(var) => {
                tracing::error!(var, "Credential not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Missing {var}"),
                    None,
                )
            }
            ApiError::AiConnection(details) => {
                tracing::error!(%details, "Upstream AI call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AI connection error".to_string(),
                    Some(details),
                )
            }
            ApiError::Busy(kind) => (StatusCode::CONFLICT, kind.busy_message().to_string(), None),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        (status, Json(ErrorBody { error, details })).into_response()
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::Configuration(var) => ApiError::MissingCredential(var),
            SummaryError::Validation(message) => ApiError::BadRequest(message),
            e if e.is_gateway_error() => ApiError::AiConnection(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<InFlightError> for ApiError {
    fn from(err: InFlightError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("model call task failed: {err}"))
    }
}
