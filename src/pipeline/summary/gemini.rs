use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;

use super::gemini_types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData, Part,
};
use super::types::{GenerationRequest, LlmClient};
use super::SummaryError;

/// Public Gemini REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// A model id must stay one path segment under `/v1beta/models/`.
static MODEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

/// Bare model id (without `models/`), if it is safe to put in the URL path.
pub fn validate_model_name(model: &str) -> Result<&str, SummaryError> {
    let id = model.strip_prefix("models/").unwrap_or(model);
    if MODEL_ID.is_match(id) {
        Ok(id)
    } else {
        Err(SummaryError::Validation(format!("Invalid modelName: {model:?}")))
    }
}

/// Gemini HTTP client for hosted inference.
pub struct GeminiClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Create a client for the Gemini API at `base_url`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SummaryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SummaryError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    fn endpoint(&self, model: &str) -> Result<String, SummaryError> {
        let id = validate_model_name(model)?;
        Ok(format!("{}/v1beta/models/{}:generateContent", self.base_url, id))
    }
}

impl LlmClient for GeminiClient {
    fn generate(&self, api_key: &str, request: &GenerationRequest) -> Result<String, SummaryError> {
        let url = self.endpoint(&request.model)?;

        let mut parts = vec![Part::Text {
            text: &request.prompt,
        }];
        parts.extend(request.images.iter().map(|image| Part::InlineData {
            inline_data: InlineData {
                mime_type: &image.mime_type,
                data: &image.data,
            },
        }));

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: request.response_schema.as_ref(),
            },
        };

        tracing::debug!(
            model = %request.model,
            prompt_len = request.prompt.len(),
            images = request.images.len(),
            "Sending generateContent"
        );
        let started = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    SummaryError::Connection(format!("{} ({e})", self.base_url))
                } else if e.is_timeout() {
                    SummaryError::Timeout(self.timeout_secs)
                } else {
                    SummaryError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SummaryError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| SummaryError::ResponseParsing(e.to_string()))?;

        let text = parsed
            .first_text()
            .ok_or_else(|| SummaryError::NoCandidates(parsed.empty_reason()))?;

        tracing::debug!(
            model = %request.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_len = text.len(),
            "generateContent completed"
        );
        Ok(text)
    }
}

enum MockBehavior {
    Respond(String),
    Echo,
    Fail(String),
}

/// Mock LLM client for testing.
pub struct MockLlmClient {
    behavior: MockBehavior,
}

impl MockLlmClient {
    /// Always returns `response`.
    pub fn new(response: &str) -> Self {
        Self {
            behavior: MockBehavior::Respond(response.to_string()),
        }
    }

    /// Returns the prompt it was given.
    pub fn echo() -> Self {
        Self {
            behavior: MockBehavior::Echo,
        }
    }

    /// Fails every call with a transport error.
    pub fn failing(message: &str) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.to_string()),
        }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _api_key: &str, request: &GenerationRequest) -> Result<String, SummaryError> {
        match &self.behavior {
            MockBehavior::Respond(response) => Ok(response.clone()),
            MockBehavior::Echo => Ok(request.prompt.clone()),
            MockBehavior::Fail(message) => Err(SummaryError::HttpClient(message.clone())),
        }
    }
}
