//! Full clinical summary on the server: intake in, normalized record out.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::{acquire, lenient_body, session_id};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::in_flight::RequestKind;
use crate::pipeline::summary::{ClinicalSummaryRequest, ClinicalSummaryResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: ClinicalSummaryResult,
    pub degraded: bool,
    /// Model text as received, only when it could not be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// `POST /api/summary`. One outstanding request per `x-session-id`.
pub async fn summarize(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SummaryResponse>, ApiError> {
    let request: ClinicalSummaryRequest = lenient_body(&body);
    if !request.has_content() {
        return Err(ApiError::BadRequest(
            "Missing transcript or images in request body".into(),
        ));
    }

    let session = session_id(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());
    let slot = acquire(&ctx.in_flight, &session, RequestKind::ClinicalSummary)?;

    let pipeline = ctx.pipeline.clone();
    let normalized = tokio::task::spawn_blocking(move || {
        let _slot = slot;
        pipeline.summarize(&request)
    })
    .await??;

    Ok(Json(SummaryResponse {
        summary: normalized.result(),
        degraded: normalized.is_degraded(),
        raw_output: normalized.raw_text().map(str::to_string),
    }))
}
