use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use super::types::{ClinicalSummaryResult, NormalizedSummary, VitalSigns};
use super::SummaryError;

/// Top-level keys of a clinical summary as the model is asked to emit them.
pub const SUMMARY_KEYS: [&str; 4] = ["symptoms", "medicines", "vital_signs", "clinical_note"];

/// A ```json block somewhere inside prose.
static EMBEDDED_JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json\s*(.*?)```").unwrap());

/// Normalize one raw model response. Never fails: unusable output degrades
/// to the raw text.
pub fn normalize_response(raw: &str) -> NormalizedSummary {
    match parse_summary_json(strip_code_fences(raw)) {
        Ok(result) => NormalizedSummary::Parsed(result),
        Err(e) => {
            tracing::warn!(error = %e, len = raw.len(), "Model output not structured, degrading to raw text");
            NormalizedSummary::Degraded {
                raw_text: raw.to_string(),
            }
        }
    }
}

/// Remove a markdown code fence around the payload.
///
/// Handles a leading fence (with or without info string, closed or cut off)
/// and a ```json block inside surrounding prose. Unfenced text is returned
/// trimmed, so stripping twice equals stripping once.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(after_open) = trimmed.strip_prefix("```") {
        let content = match after_open.find('\n') {
            Some(newline) => &after_open[newline + 1..],
            None => after_open.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        let content = match content.rfind("```") {
            Some(close) => &content[..close],
            None => content,
        };
        return content.trim();
    }

    if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
        if let Some(block) = EMBEDDED_JSON_BLOCK.captures(trimmed).and_then(|c| c.get(1)) {
            return block.as_str().trim();
        }
    }

    trimmed
}

/// Strictly parse a JSON object and map its known keys into a summary.
pub fn parse_summary_json(json_str: &str) -> Result<ClinicalSummaryResult, SummaryError> {
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| SummaryError::MalformedResponse(e.to_string()))?;

    match value {
        Value::Object(map) => Ok(map_summary_object(&map)),
        other => Err(SummaryError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

/// Gateway passthrough: the model's JSON as-is, completed with empty
/// defaults when it is a clinical summary, or `{output}` for plain text.
pub fn passthrough_output(raw: &str) -> Value {
    match serde_json::from_str::<Value>(strip_code_fences(raw)) {
        Ok(Value::Object(mut map)) => {
            if SUMMARY_KEYS.iter().any(|k| map.contains_key(*k)) {
                complete_summary_keys(&mut map);
            }
            Value::Object(map)
        }
        Ok(other) => other,
        Err(e) => {
            tracing::warn!(error = %e, "Model output is not JSON, wrapping as output");
            json!({ "output": raw })
        }
    }
}

fn complete_summary_keys(map: &mut Map<String, Value>) {
    for (key, default) in [
        ("symptoms", json!([])),
        ("medicines", json!([])),
        ("vital_signs", json!({})),
        ("clinical_note", json!("")),
    ] {
        let slot = map.entry(key).or_insert(Value::Null);
        if slot.is_null() {
            *slot = default;
        }
    }
}

fn map_summary_object(map: &Map<String, Value>) -> ClinicalSummaryResult {
    ClinicalSummaryResult {
        symptoms: field(map, &["symptoms"]).map(string_list).unwrap_or_default(),
        medicines: field(map, &["medicines", "medications"])
            .map(string_list)
            .unwrap_or_default(),
        vital_signs: field(map, &["vital_signs", "vitalSigns", "vitals"])
            .map(vital_signs)
            .unwrap_or_default(),
        clinical_note: field(map, &["clinical_note", "clinicalNote"])
            .map(note_text)
            .unwrap_or_default(),
    }
}

/// First non-null value among the accepted spellings of a key.
fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Lenient list: non-scalar items are skipped, a lone string becomes one item.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        _ => vec![],
    }
}

fn note_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_string)
            .collect::<Vec<_>>()
            .join("\n"),
        other => scalar_string(other).unwrap_or_default(),
    }
}

fn vital_signs(value: &Value) -> VitalSigns {
    let Value::Object(map) = value else {
        return VitalSigns::default();
    };
    let get = |keys: &[&str]| field(map, keys).and_then(scalar_string);

    VitalSigns {
        pulse: get(&["pulse", "heart_rate", "heartRate"]),
        temperature: get(&["temperature"]),
        blood_pressure: get(&["blood_pressure", "bloodPressure"]),
        respiratory_rate: get(&["respiratory_rate", "respiratoryRate"]),
        height: get(&["height"]),
        weight: get(&["weight"]),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
