//! Ollama backend implementation
//!
//! Streams replies from Ollama's `/api/chat` endpoint. The response body is
//! newline-delimited JSON, one object per generated fragment:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Your"},"done":false}
//! {"message":{"role":"assistant","content":" balance"},"done":false}
//! {"message":{"role":"assistant","content":""},"done":true}
//! ```
//!
//! Context overflows are detected from the HTTP error body, from an error in
//! the first streamed object, or before sending when a context window is
//! configured and the request would not fit.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::shrink::{CharRatioEstimator, SizeEstimator};

use super::types::{is_context_overflow, ChatMessage, ChatOutcome, ChatRequest};
use super::ChatBackend;

/// Ollama chat backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    /// Context window in estimated tokens, if known
    context_window: Option<usize>,
    estimator: CharRatioEstimator,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            context_window: None,
            estimator: CharRatioEstimator::default(),
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Reject requests that would not fit `tokens` before sending them
    pub fn with_context_window(mut self, tokens: Option<usize>) -> Self {
        self.context_window = tokens;
        self
    }

    /// Use a client with a total request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    /// Estimated prompt plus reply size, if it exceeds the configured window
    fn preflight_overflow(&self, request: &ChatRequest) -> Option<String> {
        let window = self.context_window?;
        let prompt: usize = request
            .messages
            .iter()
            .map(|m| self.estimator.estimate(&m.content))
            .sum();
        let needed = prompt + request.options.max_tokens as usize;

        (needed > window).then(|| {
            format!(
                "Context window size exceeded: ~{} tokens needed, model window is {}",
                needed, window
            )
        })
    }
}

/// Request to Ollama chat API
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<usize>,
}

/// One line of a streamed chat response
#[derive(Debug, Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome> {
        if let Some(detail) = self.preflight_overflow(request) {
            debug!(model = %self.model, %detail, "Request rejected before sending");
            return Ok(ChatOutcome::ContextWindowExceeded { detail });
        }

        let body = OllamaChatRequest {
            model: &self.model,
            messages: &request.messages,
            stream: true,
            options: OllamaOptions {
                temperature: request.options.temperature,
                top_p: request.options.top_p,
                num_predict: request.options.max_tokens,
                num_ctx: self.context_window,
            },
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            chars = request.content_chars(),
            "Sending Ollama chat request"
        );

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let detail = error_message(&text);
            if is_context_overflow(&detail) {
                return Ok(ChatOutcome::ContextWindowExceeded { detail });
            }
            return Err(Error::Backend(format!(
                "Ollama API error ({}): {}",
                status, detail
            )));
        }

        // Overflows may also arrive as the first streamed object
        let mut fragments = decode_fragments(response.bytes_stream().boxed()).boxed();
        match fragments.next().await {
            Some(Err(Error::Backend(detail))) if is_context_overflow(&detail) => {
                Ok(ChatOutcome::ContextWindowExceeded { detail })
            }
            Some(first) => Ok(ChatOutcome::Stream(
                futures::stream::iter(Some(first)).chain(fragments).boxed(),
            )),
            None => Ok(ChatOutcome::Stream(futures::stream::empty().boxed())),
        }
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// `error` field of a JSON error body, or the raw body
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Splits a byte stream into complete lines
#[derive(Debug, Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Feed bytes, returning every line completed by them
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Trailing line without a newline, if any
    fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&std::mem::take(&mut self.buffer))
            .trim()
            .to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

enum ChunkEvent {
    Text(String),
    Done,
    Empty,
}

fn parse_chunk(line: &str) -> Result<ChunkEvent> {
    let chunk: OllamaChatChunk = serde_json::from_str(line)
        .map_err(|e| Error::Backend(format!("Malformed Ollama stream line: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(Error::Backend(error));
    }

    let text = chunk.message.map(|m| m.content).unwrap_or_default();
    Ok(match (text.is_empty(), chunk.done) {
        (false, _) => ChunkEvent::Text(text),
        (true, true) => ChunkEvent::Done,
        (true, false) => ChunkEvent::Empty,
    })
}

struct DecodeState<S> {
    bytes: S,
    decoder: LineDecoder,
    pending: VecDeque<String>,
    finished: bool,
}

/// Turn an NDJSON byte stream into reply fragments
///
/// Ends after the `done` object; the first error ends the stream.
fn decode_fragments<S, B>(bytes: S) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = reqwest::Result<B>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        bytes,
        decoder: LineDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.pending.pop_front() {
                match parse_chunk(&line) {
                    Ok(ChunkEvent::Text(text)) => return Some((Ok(text), st)),
                    Ok(ChunkEvent::Empty) => continue,
                    Ok(ChunkEvent::Done) => return None,
                    Err(e) => {
                        st.pending.clear();
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                }
            }

            if st.finished {
                return None;
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = st.decoder.push(chunk.as_ref());
                    st.pending.extend(lines);
                }
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(Error::Http(e)), st));
                }
                None => {
                    st.finished = true;
                    match st.decoder.finish() {
                        Some(rest) => st.pending.push_back(rest),
                        None => {
                            warn!("Ollama stream ended without a done marker");
                            return None;
                        }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{collect_text, SamplingOptions};
    use crate::test_utils::{MockChatConfig, MockOllamaServer};

    fn byte_stream(
        parts: Vec<&'static str>,
    ) -> impl Stream<Item = reqwest::Result<Vec<u8>>> + Send + Unpin + 'static {
        futures::stream::iter(
            parts
                .into_iter()
                .map(|p| Ok(p.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    async fn decode_all(parts: Vec<&'static str>) -> Result<String> {
        collect_text(decode_fragments(byte_stream(parts)).boxed()).await
    }

    #[test]
    fn test_line_decoder_handles_split_lines() {
        let mut decoder = LineDecoder::default();
        assert!(decoder.push(b"{\"a\":").is_empty());
        assert_eq!(decoder.push(b"1}\n{\"b\""), vec!["{\"a\":1}"]);
        assert_eq!(decoder.push(b":2}\n\n"), vec!["{\"b\":2}"]);
        assert!(decoder.finish().is_none());

        decoder.push(b"{\"c\":3}");
        assert_eq!(decoder.finish().as_deref(), Some("{\"c\":3}"));
    }

    #[tokio::test]
    async fn test_decode_fragments() {
        let text = decode_all(vec![
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Your \"},\"done\":false}\n{\"mess",
            "age\":{\"role\":\"assistant\",\"content\":\"balance\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"ignored\"},\"done\":false}\n",
        ])
        .await
        .unwrap();
        assert_eq!(text, "Your balance");
    }

    #[tokio::test]
    async fn test_decode_without_trailing_newline() {
        let text = decode_all(vec![
            "{\"message\":{\"content\":\"ok\"},\"done\":true}",
        ])
        .await
        .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_stream_error_object() {
        let err = decode_all(vec![
            "{\"message\":{\"content\":\"par\"},\"done\":false}\n{\"error\":\"model crashed\"}\n",
        ])
        .await
        .unwrap_err();
        assert!(err.to_string().contains("model crashed"));
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":"input exceeds the context length"}"#),
            "input exceeds the context length"
        );
        assert_eq!(error_message(" plain failure \n"), "plain failure");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("hi")];
        let body = OllamaChatRequest {
            model: "llama3.2",
            messages: &messages,
            stream: true,
            options: OllamaOptions {
                temperature: 0.3,
                top_p: 0.85,
                num_predict: 600,
                num_ctx: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["options"]["num_predict"], 600);
        assert!(json["options"].get("num_ctx").is_none());
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_preflight_overflow() {
        let backend = OllamaBackend::new("http://localhost:11434/", "llama3.2");
        assert_eq!(backend.host(), "http://localhost:11434");

        let request = ChatRequest {
            messages: vec![ChatMessage::system("x".repeat(4000))],
            options: SamplingOptions::default(),
        };
        assert!(backend.preflight_overflow(&request).is_none());

        let small = backend.clone().with_context_window(Some(1200));
        assert!(small.preflight_overflow(&request).is_some());

        let large = backend.with_context_window(Some(4096));
        assert!(large.preflight_overflow(&request).is_none());
    }

    fn short_request() -> ChatRequest {
        ChatRequest {
            messages: vec![
                ChatMessage::system("Answer from the data."),
                ChatMessage::user("How much did I spend?"),
            ],
            options: SamplingOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_chat_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");
        assert!(backend.health_check().await);

        let ChatOutcome::Stream(stream) = backend.chat(&short_request()).await.unwrap() else {
            panic!("expected a stream");
        };
        assert_eq!(collect_text(stream).await.unwrap(), "Your balance is fine.");
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn test_http_overflow_is_an_outcome() {
        let server = MockOllamaServer::start_with(MockChatConfig {
            context_limit: Some(10),
            ..Default::default()
        })
        .await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2");

        let outcome = backend.chat(&short_request()).await.unwrap();
        match outcome {
            ChatOutcome::ContextWindowExceeded { detail } => {
                assert!(detail.contains("context length"));
            }
            other => panic!("expected overflow, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preflight_skips_the_request() {
        let server = MockOllamaServer::start().await;
        let backend =
            OllamaBackend::new(&server.url(), "llama3.2").with_context_window(Some(100));

        let outcome = backend.chat(&short_request()).await.unwrap();
        assert!(outcome.is_context_exceeded());
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let backend = OllamaBackend::new("http://127.0.0.1:9", "llama3.2");
        assert!(!backend.health_check().await);
        assert!(backend.chat(&short_request()).await.is_err());
    }
}
