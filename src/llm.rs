//! Chat-completion client for the text-transformation endpoint
//!
//! Summarization and classification go through one HTTP endpoint that
//! speaks the OpenAI chat-completions shape. The endpoint is treated as
//! untrusted: non-2xx statuses, undecodable bodies, and empty replies
//! are all surfaced as `AppError::Upstream` or absent content, never as
//! panics. `ChatProvider` is the seam the operation layer depends on;
//! tests substitute a scripted fake.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::errors::{AppError, AppResult};

/// A message in a chat conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author role (`"system"` or `"user"` here)
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an arbitrary role
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

/// A chat-completion request
///
/// All fields are always serialized; the endpoint contract here has no
/// optional request parameters.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Conversation messages, system prompt first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f64,
    /// Completion length cap
    pub max_tokens: u32,
}

/// A chat-completion response, decoded leniently
///
/// Every field defaults when absent so a structurally thin reply decodes
/// to an empty response instead of a decode error. Only bodies that are
/// not JSON objects at all fail to decode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatResponse {
    /// Completion choices; first one is consumed
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// One completion choice
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Choice {
    /// The generated message
    #[serde(default)]
    pub message: ResponseMessage,
}

/// The message inside a completion choice
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseMessage {
    /// Generated text; empty when the endpoint returned none
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    /// Content of the first choice, if any was generated
    ///
    /// Whitespace-only content counts as absent, matching the callers'
    /// treatment of an empty reply as a failed generation.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .filter(|content| !content.trim().is_empty())
    }
}

/// The seam between operations and the external endpoint
///
/// Production uses [`HttpChatClient`]; operation tests use a scripted
/// in-memory fake.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send one chat-completion request and decode the reply
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse>;
}

/// HTTP implementation of [`ChatProvider`]
///
/// Posts to the configured URL as-is; the URL already names the full
/// chat-completions path. No client-side timeout is set, the caller owns
/// the deadline around each operation.
pub struct HttpChatClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
}

impl HttpChatClient {
    /// Create a client for the configured endpoint
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

impl std::fmt::Debug for HttpChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatClient")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl ChatProvider for HttpChatClient {
    async fn complete(&self, request: &ChatRequest) -> AppResult<ChatResponse> {
        debug!(
            url = %self.url,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let mut req = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key.expose_secret()));
        }

        let response = req
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("request failed: {e}")))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(AppError::AuthFailed(body));
            }
            return Err(AppError::upstream(format!("HTTP {status}: {body}")));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("failed to parse response: {e}")))?;

        debug!(
            choices = chat_response.choices.len(),
            "chat completion response received"
        );

        Ok(chat_response)
    }
}
