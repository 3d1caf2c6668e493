use crate::error::ModelError;
use crate::http::{default_agent, retry_delay, should_retry};
use crate::types::ChatRole;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use std::thread;

use super::{GenerateRequest, GenerativeModel, Part};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
const MAX_RETRIES: usize = 2;

/// Multimodal provider speaking the Gemini generateContent API.
pub struct GeminiClient {
    model: String,
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl GeminiClient {
    pub fn new(model: Option<&str>, api_key: Option<&str>) -> Result<Self, ModelError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ModelError::Failed("model API key not set".into()))?
            .to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Ok(Self {
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
            base_url,
            api_key,
            agent: default_agent(),
        })
    }

    fn build_request_body(request: &GenerateRequest) -> serde_json::Value {
        let mut contents = Vec::with_capacity(request.history.len() + 1);
        for turn in &request.history {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            contents.push(json!({
                "role": role,
                "parts": [{"text": turn.text}],
            }));
        }

        let parts: Vec<serde_json::Value> = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({"text": text}),
                Part::InlineImage { mime, data } => json!({
                    "inlineData": {
                        "mimeType": mime,
                        "data": BASE64.encode(data),
                    }
                }),
            })
            .collect();
        contents.push(json!({"role": "user", "parts": parts}));

        let mut body = json!({"contents": contents});
        if let Some(system) = &request.system {
            body["systemInstruction"] = json!({"parts": [{"text": system}]});
        }
        if request.json_response {
            body["generationConfig"] = json!({"responseMimeType": "application/json"});
        }
        body
    }

    fn parse_response(body: &str) -> Result<String, ModelError> {
        let response: GeminiResponse =
            serde_json::from_str(body).map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no candidates".into()))?;
        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(ModelError::InvalidResponse("empty response".into()));
        }
        Ok(text.trim().to_string())
    }
}

impl GenerativeModel for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn generate(&self, request: &GenerateRequest) -> Result<String, ModelError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = Self::build_request_body(request);

        let mut last_error: Option<ureq::Error> = None;
        for attempt in 0..=MAX_RETRIES {
            let response = self
                .agent
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .send_json(body.clone());

            match response {
                Ok(resp) => {
                    let raw = resp
                        .into_body()
                        .read_to_string()
                        .map_err(|e| ModelError::Network(format!("{e}")))?;
                    return Self::parse_response(raw.trim());
                }
                Err(err) => {
                    let retry = should_retry(&err);
                    last_error = Some(err);
                    if retry && attempt < MAX_RETRIES {
                        thread::sleep(retry_delay(attempt));
                        continue;
                    }
                    break;
                }
            }
        }

        Err(ModelError::Network(
            last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "model request failed".to_string()),
        ))
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatTurn;

    #[test]
    fn parse_response_extracts_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"isDuplicate\": false}"}]}}]}"#;
        let text = GeminiClient::parse_response(body).unwrap();
        assert!(text.contains("isDuplicate"));
    }

    #[test]
    fn parse_response_joins_split_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"hello "},{"text":"there"}]}}]}"#;
        assert_eq!(GeminiClient::parse_response(body).unwrap(), "hello there");
    }

    #[test]
    fn parse_response_rejects_empty_payloads() {
        assert!(GeminiClient::parse_response(r#"{"candidates":[]}"#).is_err());
        assert!(
            GeminiClient::parse_response(r#"{"candidates":[{"content":{"parts":[]}}]}"#).is_err()
        );
    }

    #[test]
    fn request_body_carries_history_and_inline_image() {
        let request = GenerateRequest {
            system: Some("be helpful".to_string()),
            history: vec![ChatTurn {
                role: ChatRole::Model,
                text: "hi".to_string(),
            }],
            parts: vec![
                Part::Text("compare".to_string()),
                Part::InlineImage {
                    mime: "image/jpeg".to_string(),
                    data: vec![1, 2, 3],
                },
            ],
            json_response: true,
        };
        let body = GeminiClient::build_request_body(&request);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be helpful");
        assert_eq!(body["contents"][0]["role"], "model");
        assert_eq!(body["contents"][1]["role"], "user");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "compare");
        assert_eq!(
            body["contents"][1]["parts"][1]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn request_body_omits_optional_sections() {
        let body = GeminiClient::build_request_body(&GenerateRequest::text("hello"));
        assert!(body.get("systemInstruction").is_none());
        assert!(body.get("generationConfig").is_none());
    }
}
