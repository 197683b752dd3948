//! Pluggable chat backend abstraction
//!
//! # Architecture
//!
//! - `ChatBackend` trait: streaming chat completion plus health/identity
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env().expect("set OLLAMA_HOST or AI_BACKEND=mock");
//! match ai.chat(&request).await? {
//!     ChatOutcome::Stream(stream) => { /* print fragments */ }
//!     ChatOutcome::ContextWindowExceeded { detail } => { /* shrink and retry */ }
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;
pub mod types;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use types::*;

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::error::Result;

/// Interface for all chat backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send a conversation and stream the reply
    ///
    /// A context-window overflow is returned as
    /// [`ChatOutcome::ContextWindowExceeded`]; every other failure is an error.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `ollama` (default): Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    /// Like [`AIClient::from_env`], with model settings applied
    ///
    /// `OLLAMA_MODEL` still wins over the configured model name.
    pub fn from_env_with_config(model: &ModelConfig) -> Result<Option<Self>> {
        let Some(client) = Self::from_env() else {
            return Ok(None);
        };

        Ok(Some(match client {
            AIClient::Ollama(b) => {
                let b = if std::env::var("OLLAMA_MODEL").is_ok() {
                    b
                } else {
                    b.with_model(&model.name)
                };
                AIClient::Ollama(
                    b.with_context_window(model.context_window)
                        .with_timeout(model.timeout)?,
                )
            }
            mock => mock,
        }))
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }
}

// Implement ChatBackend for AIClient by delegating to the inner backend
#[async_trait]
impl ChatBackend for AIClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        match self {
            AIClient::Ollama(b) => b.chat(request).await,
            AIClient::Mock(b) => b.chat(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
