use std::time::Instant;

use super::attachments::inline_images;
use super::gemini::validate_model_name;
use super::parser::normalize_response;
use super::prompt::{build_summary_prompt, compose_prompt, summary_response_schema};
use super::types::{ClinicalSummaryRequest, GenerationRequest, LlmClient, NormalizedSummary};
use super::SummaryError;
use crate::config::{CredentialSource, API_KEY_VAR};

/// Runs the AI summarization path:
/// validate → credential → prompt → one model call → normalize
pub struct SummaryPipeline {
    llm: Box<dyn LlmClient + Send + Sync>,
    credentials: Box<dyn CredentialSource + Send + Sync>,
    default_model: String,
}

impl SummaryPipeline {
    pub fn new(
        llm: Box<dyn LlmClient + Send + Sync>,
        credentials: Box<dyn CredentialSource + Send + Sync>,
        default_model: &str,
    ) -> Self {
        Self {
            llm,
            credentials,
            default_model: default_model.to_string(),
        }
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn credential_configured(&self) -> bool {
        self.credentials.api_key().is_some()
    }

    /// Raw gateway call: returns the model's text for a caller-built prompt.
    pub fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        model_override: Option<&str>,
    ) -> Result<String, SummaryError> {
        if prompt.trim().is_empty() {
            return Err(SummaryError::Validation("Missing prompt in request body".into()));
        }

        let request = GenerationRequest {
            model: self.resolve_model(model_override)?,
            prompt: compose_prompt(system_instruction, prompt),
            images: Vec::new(),
            response_schema: None,
        };
        self.call(&request)
    }

    /// Full summary for one intake submission. Malformed model output is
    /// not an error here: it comes back as `NormalizedSummary::Degraded`.
    pub fn summarize(
        &self,
        request: &ClinicalSummaryRequest,
    ) -> Result<NormalizedSummary, SummaryError> {
        let _span = tracing::info_span!(
            "summarize",
            transcript_len = request.transcript.len(),
            images = request.image_count()
        )
        .entered();

        if !request.has_content() {
            return Err(SummaryError::Validation(
                "Missing transcript or images in request body".into(),
            ));
        }

        let generation = GenerationRequest {
            model: self.default_model.clone(),
            prompt: build_summary_prompt(request),
            images: inline_images(request),
            response_schema: Some(summary_response_schema()),
        };
        let raw = self.call(&generation)?;

        let summary = normalize_response(&raw);
        tracing::info!(
            degraded = summary.is_degraded(),
            symptoms = summary.result().symptoms.len(),
            "Clinical summary normalized"
        );
        Ok(summary)
    }

    /// The single outbound round trip. Credential is read per invocation,
    /// after input validation and before any network traffic. No retry.
    fn call(&self, request: &GenerationRequest) -> Result<String, SummaryError> {
        let api_key = self
            .credentials
            .api_key()
            .ok_or(SummaryError::Configuration(API_KEY_VAR))?;

        let started = Instant::now();
        match self.llm.generate(&api_key, request) {
            Ok(text) => {
                tracing::info!(
                    model = %request.model,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Model call succeeded"
                );
                Ok(text)
            }
            Err(e) => {
                tracing::error!(model = %request.model, error = %e, "Model call failed");
                Err(e)
            }
        }
    }

    /// Caller's model if given, else the default. Rejected unless it is a bare model id.
    fn resolve_model(&self, model_override: Option<&str>) -> Result<String, SummaryError> {
        let model = model_override
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model);
        validate_model_name(model).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;
    use crate::pipeline::summary::gemini::{MockLlmClient, DEFAULT_MODEL};
    use crate::pipeline::summary::types::ClinicalSummaryResult;

    fn pipeline(llm: MockLlmClient) -> SummaryPipeline {
        SummaryPipeline::new(
            Box::new(llm),
            Box::new(StaticCredentials::new("test-key")),
            DEFAULT_MODEL,
        )
    }

    fn without_credentials(llm: MockLlmClient) -> SummaryPipeline {
        SummaryPipeline::new(Box::new(llm), Box::new(StaticCredentials::missing()), DEFAULT_MODEL)
    }

    #[test]
    fn generate_composes_system_instruction_first() {
        let out = pipeline(MockLlmClient::echo())
            .generate("Đau họng", Some("Chỉ trả về JSON"), None)
            .unwrap();
        assert_eq!(out, "Chỉ trả về JSON\n\nĐau họng");
    }

    #[test]
    fn empty_prompt_is_rejected_before_credential_check() {
        let err = without_credentials(MockLlmClient::echo())
            .generate("  ", None, None)
            .unwrap_err();
        assert!(matches!(err, SummaryError::Validation(_)));
    }

    #[test]
    fn missing_credential_fails_fast() {
        let err = without_credentials(MockLlmClient::failing("must not be called"))
            .generate("Sốt", None, None)
            .unwrap_err();
        assert!(matches!(err, SummaryError::Configuration("GEMINI_API_KEY")));
    }

    #[test]
    fn gateway_errors_propagate_unchanged() {
        let err = pipeline(MockLlmClient::failing("connection reset"))
            .generate("Sốt", None, None)
            .unwrap_err();
        assert!(err.is_gateway_error());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn model_override_falls_back_to_default() {
        let p = pipeline(MockLlmClient::echo());
        assert_eq!(p.resolve_model(Some("gemini-1.5-pro")).unwrap(), "gemini-1.5-pro");
        assert_eq!(p.resolve_model(Some("models/gemini-1.5-pro")).unwrap(), "gemini-1.5-pro");
        assert_eq!(p.resolve_model(Some(" ")).unwrap(), DEFAULT_MODEL);
        assert_eq!(p.resolve_model(None).unwrap(), DEFAULT_MODEL);
    }

    #[test]
    fn unsafe_model_name_is_rejected_before_credential_check() {
        let err = without_credentials(MockLlmClient::failing("must not be called"))
            .generate("Sốt", None, Some("x/../../v1beta/cachedContents?pageSize=1&"))
            .unwrap_err();
        assert!(matches!(err, SummaryError::Validation(ref m) if m.starts_with("Invalid modelName")));
    }

    #[test]
    fn summarize_parses_structured_output() {
        let response = r#"```json
{"symptoms": ["Đau họng", "Sốt nhẹ"], "medicines": [], "vital_signs": {"temperature": "37.5"}, "clinical_note": "Khởi phát 2 ngày"}
```"#;
        let summary = pipeline(MockLlmClient::new(response))
            .summarize(&ClinicalSummaryRequest::from_transcript("Đau họng, sốt nhẹ"))
            .unwrap();
        let NormalizedSummary::Parsed(result) = summary else {
            panic!("expected parsed summary");
        };
        assert_eq!(result.symptoms, vec!["Đau họng", "Sốt nhẹ"]);
        assert_eq!(result.vital_signs.temperature.as_deref(), Some("37.5"));
    }

    #[test]
    fn summarize_degrades_on_plain_text() {
        let summary = pipeline(MockLlmClient::new("Không đủ thông tin."))
            .summarize(&ClinicalSummaryRequest::from_transcript("ừm"))
            .unwrap();
        assert!(summary.is_degraded());
        assert_eq!(
            summary.result(),
            ClinicalSummaryResult {
                clinical_note: "Không đủ thông tin.".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn summarize_sends_transcript_in_prompt() {
        // Echo output is the prompt itself: not JSON, so it degrades with the prompt as raw text.
        let summary = pipeline(MockLlmClient::echo())
            .summarize(&ClinicalSummaryRequest::from_transcript("Khó thở khi leo cầu thang"))
            .unwrap();
        assert!(summary.raw_text().unwrap().contains("Khó thở khi leo cầu thang"));
    }

    #[test]
    fn summarize_rejects_empty_submission() {
        let err = pipeline(MockLlmClient::echo())
            .summarize(&ClinicalSummaryRequest::default())
            .unwrap_err();
        assert!(matches!(err, SummaryError::Validation(_)));
    }

    #[test]
    fn credential_status_reported() {
        assert!(pipeline(MockLlmClient::echo()).credential_configured());
        assert!(!without_credentials(MockLlmClient::echo()).credential_configured());
    }
}
