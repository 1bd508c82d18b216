use serde::{Deserialize, Serialize};

use super::SummaryError;

/// One intake submission: what the patient said plus the photos they attached.
///
/// Built when the intake step is submitted and consumed by exactly one
/// model call. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicalSummaryRequest {
    pub transcript: String,
    /// Symptom photos.
    pub images: Vec<String>,
    pub medication_images: Vec<String>,
    pub previous_result_images: Vec<String>,
    #[serde(alias = "systemPrompt", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

impl ClinicalSummaryRequest {
    pub fn from_transcript(transcript: &str) -> Self {
        Self {
            transcript: transcript.to_string(),
            ..Self::default()
        }
    }

    /// True when there is anything worth sending to the model.
    pub fn has_content(&self) -> bool {
        !self.transcript.trim().is_empty() || self.image_count() > 0
    }

    pub fn image_count(&self) -> usize {
        self.images.len() + self.medication_images.len() + self.previous_result_images.len()
    }
}

/// Vital signs the summary can carry. All optional; the model fills what it heard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalSigns {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
}

impl VitalSigns {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Structured pre-visit record extracted from a transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalSummaryResult {
    pub symptoms: Vec<String>,
    pub medicines: Vec<String>,
    pub vital_signs: VitalSigns,
    pub clinical_note: String,
}

/// Outcome of normalizing one model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedSummary {
    Parsed(ClinicalSummaryResult),
    /// The model did not return usable JSON; its text is kept verbatim.
    Degraded { raw_text: String },
}

impl NormalizedSummary {
    pub fn is_degraded(&self) -> bool {
        matches!(self, NormalizedSummary::Degraded { .. })
    }

    /// The record to display. A degraded response becomes the clinical note.
    pub fn result(&self) -> ClinicalSummaryResult {
        match self {
            NormalizedSummary::Parsed(result) => result.clone(),
            NormalizedSummary::Degraded { raw_text } => ClinicalSummaryResult {
                clinical_note: raw_text.clone(),
                ..ClinicalSummaryResult::default()
            },
        }
    }

    pub fn raw_text(&self) -> Option<&str> {
        match self {
            NormalizedSummary::Parsed(_) => None,
            NormalizedSummary::Degraded { raw_text } => Some(raw_text),
        }
    }
}

/// Image sent inline with the prompt (base64 payload, not decoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// A single generation call as seen by an `LlmClient`.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub images: Vec<InlineImage>,
    /// Optional output schema; the JSON-only response mode is always requested.
    pub response_schema: Option<serde_json::Value>,
}

/// Generative model client abstraction (allows mocking)
pub trait LlmClient {
    /// One round trip. Returns the model's text output.
    fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String, SummaryError>;
}
