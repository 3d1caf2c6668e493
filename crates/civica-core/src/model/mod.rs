pub mod gemini;

use crate::error::ModelError;
use crate::types::ChatTurn;

/// One piece of a user turn sent to a multimodal model.
pub enum Part {
    Text(String),
    /// Inline image bytes with their mime type (JPEG for captures, the
    /// picked file's type for imports).
    InlineImage {
        mime: String,
        data: Vec<u8>,
    },
}

/// A single generate call: optional system instruction, prior role-tagged
/// history, and the parts of the new user turn.
pub struct GenerateRequest {
    pub system: Option<String>,
    pub history: Vec<ChatTurn>,
    pub parts: Vec<Part>,
    /// Ask the model for a JSON document instead of prose.
    pub json_response: bool,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            history: Vec::new(),
            parts: vec![Part::Text(prompt.into())],
            json_response: false,
        }
    }
}

/// A generative-model provider. Implementations own transport and retries;
/// response interpretation stays with the caller.
pub trait GenerativeModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError>;
}

pub fn create_model(
    provider: &str,
    model: Option<&str>,
    api_key: Option<&str>,
) -> Result<Box<dyn GenerativeModel>, ModelError> {
    match provider {
        "gemini" => Ok(Box::new(gemini::GeminiClient::new(model, api_key)?)),
        other => Err(ModelError::Failed(format!(
            "unknown model provider: {other}"
        ))),
    }
}

/// Stand-in used when no provider can be constructed (typically a missing
/// API key). Every call fails, so callers run on their degraded paths:
/// fallback classification, not-a-duplicate verdicts, the chat apology.
pub struct UnconfiguredModel;

impl GenerativeModel for UnconfiguredModel {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    fn generate(&self, _request: &GenerateRequest) -> Result<String, ModelError> {
        Err(ModelError::Failed("model API key not set".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_rejects_unknown_provider() {
        let err = create_model("openai", None, Some("key")).err().unwrap();
        assert!(err.to_string().contains("unknown model provider"));
    }

    #[test]
    fn factory_requires_api_key_for_gemini() {
        assert!(create_model("gemini", None, None).is_err());
        assert!(create_model("gemini", None, Some("  ")).is_err());
        assert!(create_model("gemini", None, Some("key")).is_ok());
    }
}
