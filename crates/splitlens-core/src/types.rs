//! Wire types for OpenAI-compatible chat completion APIs.
//!
//! Only the subset the analyst needs: plain-text messages out, the first
//! choice's text back, and the provider's error envelope.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────

/// An outbound chat message. The analyst only ever sends a single user turn.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Message {
            role: "user",
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Request
// ─────────────────────────────────────────────

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

// ─────────────────────────────────────────────
// Response
// ─────────────────────────────────────────────

/// Raw chat completion response.
///
/// `choices` defaults to empty so a body without the field still decodes and
/// the caller can report the shape problem itself.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub usage: Option<UsageInfo>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if there is one and it carries content.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

/// The assistant message within a chat completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Provider error envelope
// ─────────────────────────────────────────────

/// Error body returned by OpenAI-compatible providers.
///
/// Seen in the wild as `{"error": {"message": "...", "type": "..."}}` and as
/// `{"error": "..."}`.
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProviderErrorDetail {
    Structured {
        message: String,
        #[serde(rename = "type", default)]
        kind: Option<String>,
    },
    Text(String),
}

impl ProviderErrorBody {
    /// Try to pull a human-readable message out of a raw error body.
    ///
    /// Returns `None` for anything that is not one of the known shapes.
    pub fn extract_message(body: &str) -> Option<String> {
        let parsed: ProviderErrorBody = serde_json::from_str(body).ok()?;
        let message = match parsed.error {
            ProviderErrorDetail::Structured { message, .. } => message,
            ProviderErrorDetail::Text(text) => text,
        };
        let message = message.trim();
        (!message.is_empty()).then(|| message.to_string())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
