//! Image references attached to an intake submission.
//!
//! The browser hands over opaque URIs. Only `data:image/*;base64,` URIs carry
//! their bytes and can be forwarded to the model as inline parts; `blob:` and
//! remote URLs stay client-side and are only counted in the prompt.

use base64::Engine;

use super::types::{ClinicalSummaryRequest, InlineImage};

/// Decode a base64 image data URI into an inline part. `None` for anything else.
pub fn decode_data_uri(uri: &str) -> Option<InlineImage> {
    let rest = uri.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    if !mime_type.starts_with("image/") {
        return None;
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;

    Some(InlineImage {
        mime_type: mime_type.to_string(),
        data: payload.to_string(),
    })
}

/// Inline images of a request, symptom photos first, then medications, then prior results.
pub fn inline_images(request: &ClinicalSummaryRequest) -> Vec<InlineImage> {
    let all = request
        .images
        .iter()
        .chain(&request.medication_images)
        .chain(&request.previous_result_images);

    let inlined: Vec<InlineImage> = all.filter_map(|uri| decode_data_uri(uri)).collect();

    let skipped = request.image_count() - inlined.len();
    if skipped > 0 {
        tracing::debug!(skipped, "Image references not inlinable, sent as counts only");
    }
    inlined
}
