//! Mock backend for testing
//!
//! Answers without a running LLM server. By default the reply is derived from
//! the totals in the financial summary found in the system message, so the
//! CLI stays usable with `AI_BACKEND=mock`. Tests can script fragments and a
//! simulated context limit, and inspect every request received.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::{Error, Result};
use crate::prompts::DATA_MARKER;

use super::types::{ChatOutcome, ChatRequest, Role};
use super::ChatBackend;

/// Mock chat backend
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    /// Scripted reply fragments; None derives a reply from the request
    fragments: Option<Vec<String>>,
    /// Requests whose content exceeds this many characters overflow
    context_limit: Option<usize>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            fragments: None,
            context_limit: None,
            requests: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Create a new instance with a different model name
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Always stream these fragments
    pub fn with_reply<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments = Some(fragments.into_iter().map(Into::into).collect());
        self
    }

    /// Report a context overflow for requests longer than `chars`
    pub fn with_context_limit(mut self, chars: usize) -> Self {
        self.context_limit = Some(chars);
        self
    }

    /// Number of chat calls received, including overflowed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request received, oldest first
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .map_err(|_| Error::Backend("Mock request log poisoned".into()))?
            .push(request.clone());

        let size = request.content_chars();
        if let Some(limit) = self.context_limit {
            if size > limit {
                return Ok(ChatOutcome::ContextWindowExceeded {
                    detail: format!("Context window size exceeded: {} > {}", size, limit),
                });
            }
        }

        let fragments = match &self.fragments {
            Some(scripted) => scripted.clone(),
            None => derived_reply(request)
                .split_inclusive(' ')
                .map(String::from)
                .collect(),
        };

        Ok(ChatOutcome::Stream(
            futures::stream::iter(fragments.into_iter().map(Ok)).boxed(),
        ))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

/// Short answer built from the summary totals in the system message
fn derived_reply(request: &ChatRequest) -> String {
    let payload = request
        .messages
        .iter()
        .find(|m| m.role == Role::System)
        .and_then(|m| m.content.split_once(DATA_MARKER))
        .and_then(|(_, json)| serde_json::from_str::<serde_json::Value>(json).ok());

    let Some(payload) = payload else {
        return "I have no financial data to answer from.".to_string();
    };

    let totals = &payload["totals"];
    let mut reply = format!(
        "- Total income: {}\n- Total expense: {}\n- Balance: {}",
        totals["income"], totals["expense"], totals["balance"]
    );
    if let Some(month) = payload["highlights"]["maxExpenseMonth"].as_str() {
        reply.push_str(&format!(
            "\n- Highest spending: {} ({})",
            month, payload["highlights"]["maxExpense"]
        ));
    }
    reply
}
