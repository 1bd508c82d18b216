//! Gateway passthrough: one prompt in, the model's JSON out.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{acquire, lenient_body, session_id};
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::in_flight::RequestKind;
use crate::pipeline::summary::passthrough_output;

/// Fields are loose `Value`s: a non-string prompt is a 400, not a 422.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayRequest {
    pub prompt: Value,
    pub system_instruction: Value,
    pub model_name: Value,
}

/// `POST /api/gemini` and `POST /api/generate`.
pub async fn generate(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: GatewayRequest = lenient_body(&body);
    let prompt = request.prompt.as_str().unwrap_or_default().to_string();
    let system_instruction = request.system_instruction.as_str().map(str::to_string);
    let model = request.model_name.as_str().map(str::to_string);

    if prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Missing prompt in request body".into()));
    }

    let slot = match session_id(&headers) {
        Some(id) => Some(acquire(&ctx.in_flight, &id, RequestKind::GatewayPassthrough)?),
        None => None,
    };

    let pipeline = ctx.pipeline.clone();
    let raw = tokio::task::spawn_blocking(move || {
        let _slot = slot;
        pipeline.generate(&prompt, system_instruction.as_deref(), model.as_deref())
    })
    .await??;

    Ok(Json(passthrough_output(&raw)))
}
