//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub credential_configured: bool,
    pub in_flight: usize,
}

/// `GET /api/health`. Never reveals the credential, only whether one is set.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        model: ctx.pipeline.default_model().to_string(),
        credential_configured: ctx.pipeline.credential_configured(),
        in_flight: ctx.in_flight.active_count(),
    })
}
