//! Base trait for LLM providers

use async_trait::async_trait;
use chat_relay_core::config::SamplingConfig;
use chat_relay_core::session::{Role, Turn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("API error: HTTP {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response contained no text content")]
    EmptyContent,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::InvalidResponse(e.to_string())
    }
}

impl ProviderError {
    /// Classify the error for diagnostics
    pub fn kind(&self) -> FailureKind {
        match self {
            ProviderError::Timeout(_) => FailureKind::Timeout,
            ProviderError::Network(_) => FailureKind::Network,
            ProviderError::ApiError { .. } => FailureKind::Http,
            ProviderError::InvalidResponse(_) => FailureKind::MalformedResponse,
            ProviderError::EmptyContent => FailureKind::EmptyContent,
            ProviderError::ConfigError(_) => FailureKind::Config,
        }
    }
}

/// Kind of backend failure, kept for operator diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Network,
    Http,
    MalformedResponse,
    EmptyContent,
    Config,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Network => "network",
            FailureKind::Http => "http",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::EmptyContent => "empty_content",
            FailureKind::Config => "config",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a generation failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl From<ProviderError> for FailureReason {
    fn from(e: ProviderError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Result of one generation request, reduced to what the caller needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Trimmed, non-empty reply text
    Success(String),
    Failure(FailureReason),
}

impl From<ProviderResult<LLMResponse>> for GenerationOutcome {
    fn from(result: ProviderResult<LLMResponse>) -> Self {
        match result.and_then(LLMResponse::into_text) {
            Ok(text) => GenerationOutcome::Success(text),
            Err(e) => GenerationOutcome::Failure(e.into()),
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: Option<String>,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: HashMap<String, i64>,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

impl LLMResponse {
    /// Response carrying only text
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: default_finish_reason(),
            usage: HashMap::new(),
        }
    }

    /// Extract the reply, trimmed. Missing or blank content is an error.
    pub fn into_text(self) -> ProviderResult<String> {
        let text = self.content.as_deref().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            Err(ProviderError::EmptyContent)
        } else {
            Ok(text.to_string())
        }
    }
}

/// A message in the request sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        Self::new(turn.role, turn.content.clone())
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send a chat request. `model` falls back to the provider default.
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        sampling: &SamplingConfig,
    ) -> ProviderResult<LLMResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_trims_reply() {
        let outcome = GenerationOutcome::from(Ok(LLMResponse::text("  hi there \n")));
        assert_eq!(outcome, GenerationOutcome::Success("hi there".to_string()));
    }

    #[test]
    fn test_blank_content_is_failure() {
        let outcome = GenerationOutcome::from(Ok(LLMResponse::text("   ")));
        match outcome {
            GenerationOutcome::Failure(reason) => {
                assert_eq!(reason.kind, FailureKind::EmptyContent)
            }
            other => panic!("expected failure, got {:?}", other),
        }

        let missing = LLMResponse {
            content: None,
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        };
        assert!(matches!(
            missing.into_text(),
            Err(ProviderError::EmptyContent)
        ));
    }

    #[test]
    fn test_error_kind_preserved_in_failure() {
        let outcome = GenerationOutcome::from(Err(ProviderError::Timeout("30s".to_string())));
        let GenerationOutcome::Failure(reason) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(reason.kind, FailureKind::Timeout);
        assert!(reason.message.contains("30s"));
    }

    #[test]
    fn test_message_serializes_role_and_content_only() {
        let value = serde_json::to_value(Message::user("Hello")).unwrap();
        assert_eq!(value, serde_json::json!({"role": "user", "content": "Hello"}));
    }

    #[test]
    fn test_message_from_turn() {
        let turn = Turn::assistant("ok");
        let message = Message::from(&turn);
        assert_eq!(message, Message::assistant("ok"));
    }
}
