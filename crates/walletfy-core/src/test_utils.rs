//! Test utilities for walletfy-core
//!
//! Provides a mock Ollama server speaking the streamed `/api/chat` protocol,
//! for development and integration tests of the HTTP backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::oneshot;

/// Behavior of the mock chat endpoint
#[derive(Debug, Clone)]
pub struct MockChatConfig {
    /// Fragments streamed for every successful request
    pub fragments: Vec<String>,
    /// Requests with more message characters than this get a 400 overflow error
    pub context_limit: Option<usize>,
}

impl Default for MockChatConfig {
    fn default() -> Self {
        Self {
            fragments: vec!["Your ".into(), "balance ".into(), "is fine.".into()],
            context_limit: None,
        }
    }
}

#[derive(Clone)]
struct ServerState {
    config: Arc<MockChatConfig>,
    requests: Arc<AtomicUsize>,
}

/// Mock Ollama server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_with(MockChatConfig::default()).await
    }

    /// Start with a custom chat behavior
    pub async fn start_with(config: MockChatConfig) -> Self {
        let requests = Arc::new(AtomicUsize::new(0));
        let state = ServerState {
            config: Arc::new(config),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/chat", post(handle_chat))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            requests,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Chat requests received so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<serde_json::Value> {
    Json(json!({
        "models": [{
            "name": "llama3.2:latest",
            "modified_at": "2024-01-01T00:00:00Z",
            "size": 2_000_000_000u64
        }]
    }))
}

#[derive(Debug, Deserialize)]
struct ChatRequestBody {
    model: String,
    messages: Vec<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    content: String,
}

/// Ollama chat endpoint, answering with NDJSON
async fn handle_chat(
    State(state): State<ServerState>,
    Json(request): Json<ChatRequestBody>,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let size: usize = request
        .messages
        .iter()
        .map(|m| m.content.chars().count())
        .sum();
    if let Some(limit) = state.config.context_limit {
        if size > limit {
            let body = json!({
                "error": format!("input length ({}) exceeds the context length ({})", size, limit)
            });
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }
    }

    let mut lines: Vec<String> = state
        .config
        .fragments
        .iter()
        .map(|fragment| {
            json!({
                "model": request.model,
                "message": {"role": "assistant", "content": fragment},
                "done": false
            })
            .to_string()
        })
        .collect();
    lines.push(
        json!({
            "model": request.model,
            "message": {"role": "assistant", "content": ""},
            "done": true
        })
        .to_string(),
    );

    let mut body = lines.join("\n");
    body.push('\n');

    ([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response()
}
