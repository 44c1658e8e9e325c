use crate::error::{GatewayError, Result, PROMPT_REQUIRED};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl AsRef<str>) -> Result<Self> {
        let prompt = prompt.as_ref().trim();
        if prompt.is_empty() {
            return Err(GatewayError::Validation(PROMPT_REQUIRED.into()));
        }
        Ok(Self {
            prompt: prompt.to_string(),
        })
    }

    /// Builds a request from a raw `{"prompt": "..."}` body. Anything that does
    /// not carry a usable string prompt is a validation failure.
    pub fn from_json_body(body: &[u8]) -> Result<Self> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|_| GatewayError::Validation(PROMPT_REQUIRED.into()))?;

        match payload.get("prompt") {
            Some(Value::String(prompt)) => Self::new(prompt),
            _ => Err(GatewayError::Validation(PROMPT_REQUIRED.into())),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub image_urls: Vec<String>,
}

impl GenerationResponse {
    pub fn new(image_urls: Vec<String>) -> Self {
        Self { image_urls }
    }

    pub fn len(&self) -> usize {
        self.image_urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_urls.is_empty()
    }
}

/// Why a single candidate in a chain did not produce images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    Upstream(String),
    NoImages,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Upstream(msg) => write!(f, "{}", msg),
            FailureReason::NoImages => write!(f, "no images in response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub provider: String,
    pub reason: FailureReason,
}

/// A successful generation together with the candidate that answered it.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub response: GenerationResponse,
    pub provider: String,
    pub failures: Vec<AttemptFailure>,
}

impl GenerationOutcome {
    pub fn new(response: GenerationResponse, provider: impl Into<String>) -> Self {
        Self {
            response,
            provider: provider.into(),
            failures: Vec::new(),
        }
    }

    pub fn with_failures(mut self, failures: Vec<AttemptFailure>) -> Self {
        self.failures = failures;
        self
    }
}
