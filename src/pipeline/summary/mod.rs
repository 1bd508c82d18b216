pub mod types;
pub mod prompt;
pub mod attachments;
pub mod parser;
pub mod gemini;
pub mod gemini_types;
pub mod orchestrator;

pub use types::*;
pub use prompt::*;
pub use attachments::*;
pub use parser::*;
pub use gemini::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Missing {0}")]
    Configuration(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("Gemini API is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Gemini returned error (status {status}): {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model returned no candidates: {0}")]
    NoCandidates(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
}

impl SummaryError {
    /// Network, transport or model-service failure. Shown to the user with a retry button.
    pub fn is_gateway_error(&self) -> bool {
        matches!(
            self,
            SummaryError::Connection(_)
                | SummaryError::Timeout(_)
                | SummaryError::HttpClient(_)
                | SummaryError::UpstreamStatus { .. }
                | SummaryError::ResponseParsing(_)
                | SummaryError::NoCandidates(_)
        )
    }
}
