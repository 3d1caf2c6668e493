use crate::model::{GenerateRequest, GenerativeModel, Part};
use crate::types::{ChatRole, ChatTurn};

const SYSTEM_INSTRUCTION: &str = "You are a helpful support assistant for the Civica civic issue \
platform. Help citizens report issues, understand rewards, and navigate the app. Keep answers \
concise.";

/// Opening turn shown before the user says anything.
pub const GREETING: &str = "Hi! I am the Civica assistant. How can I help you today?";

/// Reply substituted when the model is unreachable.
pub const APOLOGY: &str = "Sorry, I am having trouble connecting right now.";

/// A linear, append-only conversation with the support assistant. Every turn
/// forwards the full history plus the new message. History is never
/// truncated; sessions are short-lived and client-local.
pub struct ChatSession {
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            history: vec![ChatTurn {
                role: ChatRole::Model,
                text: GREETING.to_string(),
            }],
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Append the user message, ask the model, append its reply (or the
    /// apology on failure), and return what was appended.
    pub fn send(&mut self, model: &dyn GenerativeModel, message: &str) -> String {
        let request = GenerateRequest {
            system: Some(SYSTEM_INSTRUCTION.to_string()),
            history: self.history.clone(),
            parts: vec![Part::Text(message.to_string())],
            json_response: false,
        };
        self.history.push(ChatTurn {
            role: ChatRole::User,
            text: message.to_string(),
        });

        let reply = match model.generate(&request) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(_) => APOLOGY.to_string(),
        };
        self.history.push(ChatTurn {
            role: ChatRole::Model,
            text: reply.clone(),
        });
        reply
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
