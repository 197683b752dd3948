//! Chat types shared by all backends

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::Result;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            top_p: 0.85,
            max_tokens: 600,
        }
    }
}

impl From<&ModelConfig> for SamplingOptions {
    fn from(model: &ModelConfig) -> Self {
        Self {
            temperature: model.temperature,
            top_p: model.top_p,
            max_tokens: model.max_tokens,
        }
    }
}

/// A full conversation to send to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub options: SamplingOptions,
}

impl ChatRequest {
    /// Total characters across all message contents
    pub fn content_chars(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }
}

/// Reply fragments in arrival order
pub type TextStream = BoxStream<'static, Result<String>>;

/// What a backend produced for a request
///
/// Overflowing the model's context window is an expected outcome the caller
/// can react to, so it is reported here rather than as an error.
pub enum ChatOutcome {
    Stream(TextStream),
    ContextWindowExceeded { detail: String },
}

impl ChatOutcome {
    pub fn is_context_exceeded(&self) -> bool {
        matches!(self, Self::ContextWindowExceeded { .. })
    }
}

impl std::fmt::Debug for ChatOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("ChatOutcome::Stream(..)"),
            Self::ContextWindowExceeded { detail } => f
                .debug_struct("ChatOutcome::ContextWindowExceeded")
                .field("detail", detail)
                .finish(),
        }
    }
}

/// Drain a stream into the full reply text
pub async fn collect_text(mut stream: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment?);
    }
    Ok(text)
}

/// Whether a backend error message describes a context-window overflow
pub fn is_context_overflow(message: &str) -> bool {
    let lower = message.to_lowercase();
    [
        "context length",
        "context window",
        "context_length_exceeded",
        "maximum context",
        "too many tokens",
        "exceeds the context",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}
