//! Financial Q&A assistant
//!
//! Answers questions about the user's events with a chat model. Every request
//! carries a system instruction made of the prompt template and the summary
//! JSON, a window of recent conversation, and the new question.
//!
//! ## Retry policy
//!
//! The first attempt uses the primary plan (budget 3400, 6 turns by default).
//! If the backend reports a context-window overflow, the request is rebuilt
//! once with the fallback plan (budget 3000, 3 turns) and sent again. A second
//! overflow is returned as [`Error::ContextWindowExceeded`]; any other failure
//! propagates unchanged on either attempt.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::ai::{collect_text, ChatBackend, ChatMessage, ChatOutcome, ChatRequest, Role};
use crate::ai::{SamplingOptions, TextStream};
use crate::config::{AssistantConfig, ContextConfig, ContextLimits};
use crate::error::{Error, Result};
use crate::models::Event;
use crate::prompts::{render_system_instruction, PromptId, PromptLibrary};
use crate::summary::{FinancialSummary, SummaryBuilder, SummaryStats};

/// Substituted when the model streams nothing but whitespace
pub const EMPTY_REPLY_MESSAGE: &str = "I couldn't answer that with the available data.";

/// The last `max_turns` turns (two messages each) of non-system messages
pub fn recent_conversation(messages: &[ChatMessage], max_turns: usize) -> Vec<ChatMessage> {
    let conversation: Vec<&ChatMessage> =
        messages.iter().filter(|m| m.role != Role::System).collect();
    let skip = conversation.len().saturating_sub(max_turns.saturating_mul(2));
    conversation.into_iter().skip(skip).cloned().collect()
}

/// The reply, or [`EMPTY_REPLY_MESSAGE`] when it is blank
pub fn reply_or_fallback(reply: &str) -> String {
    if reply.trim().is_empty() {
        EMPTY_REPLY_MESSAGE.to_string()
    } else {
        reply.to_string()
    }
}

/// Which context limits an attempt uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPlan {
    Primary,
    Fallback,
}

impl ContextPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }

    pub fn limits(&self, config: &ContextConfig) -> ContextLimits {
        match self {
            Self::Primary => config.primary,
            Self::Fallback => config.fallback,
        }
    }

    /// Plan to retry with after an overflow, if any
    pub fn next(&self) -> Option<ContextPlan> {
        match self {
            Self::Primary => Some(Self::Fallback),
            Self::Fallback => None,
        }
    }
}

impl std::fmt::Display for ContextPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A streamed answer with the facts of how it was produced
pub struct AssistantReply {
    pub stream: TextStream,
    pub stats: SummaryStats,
    pub plan: ContextPlan,
    /// Whether the primary plan overflowed
    pub retried: bool,
}

impl AssistantReply {
    /// Drain the stream, substituting the fallback message for a blank reply
    pub async fn into_text(self) -> Result<String> {
        let text = collect_text(self.stream).await?;
        Ok(reply_or_fallback(&text))
    }
}

impl std::fmt::Debug for AssistantReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantReply")
            .field("stats", &self.stats)
            .field("plan", &self.plan)
            .field("retried", &self.retried)
            .finish_non_exhaustive()
    }
}

/// Answers questions over events through a chat backend
pub struct Assistant<B> {
    backend: B,
    prompt_template: String,
    context: ContextConfig,
    options: SamplingOptions,
    summaries: SummaryBuilder,
}

impl<B: ChatBackend> Assistant<B> {
    pub fn new(backend: B, prompt_template: impl Into<String>, config: &AssistantConfig) -> Self {
        Self {
            backend,
            prompt_template: prompt_template.into(),
            context: config.context.clone(),
            options: SamplingOptions::from(&config.model),
            summaries: SummaryBuilder::new(),
        }
    }

    /// Use the financial assistant prompt from `library`
    pub fn from_library(
        backend: B,
        library: &mut PromptLibrary,
        config: &AssistantConfig,
    ) -> Result<Self> {
        let prompt = library.get(PromptId::FinancialAssistant)?;
        Ok(Self::new(backend, prompt.content.clone(), config))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Assemble the request for one attempt
    ///
    /// `history` must not contain `question`; it is appended before the
    /// conversation window is cut, so it always survives.
    pub fn build_request(
        &self,
        events: &[Event],
        history: &[ChatMessage],
        question: &str,
        plan: ContextPlan,
    ) -> Result<(ChatRequest, FinancialSummary)> {
        let limits = plan.limits(&self.context);
        let summary = self.summaries.summarize(events, limits.size_budget)?;

        let mut conversation = history.to_vec();
        conversation.push(ChatMessage::user(question));

        let mut messages = vec![ChatMessage::system(render_system_instruction(
            &self.prompt_template,
            &summary.serialized,
        ))];
        messages.extend(recent_conversation(&conversation, limits.history_turns));

        Ok((
            ChatRequest {
                messages,
                options: self.options,
            },
            summary,
        ))
    }

    /// Ask a question, retrying once with the fallback plan on overflow
    pub async fn ask(
        &self,
        events: &[Event],
        history: &[ChatMessage],
        question: &str,
    ) -> Result<AssistantReply> {
        let mut plan = ContextPlan::Primary;
        let mut retried = false;

        loop {
            let (request, summary) = self.build_request(events, history, question, plan)?;
            debug!(
                plan = plan.as_str(),
                mode = summary.stats.mode.as_str(),
                size_estimate = summary.stats.size_estimate,
                messages = request.messages.len(),
                model = self.backend.model(),
                "Asking assistant"
            );

            match self.backend.chat(&request).await? {
                ChatOutcome::Stream(stream) => {
                    info!(
                        plan = plan.as_str(),
                        retried,
                        months = summary.stats.months_included,
                        "Assistant reply started"
                    );
                    return Ok(AssistantReply {
                        stream,
                        stats: summary.stats,
                        plan,
                        retried,
                    });
                }
                ChatOutcome::ContextWindowExceeded { detail } => match plan.next() {
                    Some(next) => {
                        warn!(
                            plan = plan.as_str(),
                            %detail,
                            "Context window exceeded, retrying with smaller context"
                        );
                        plan = next;
                        retried = true;
                    }
                    None => return Err(Error::ContextWindowExceeded(detail)),
                },
            }
        }
    }

    /// Ask and record the exchange in `history`
    ///
    /// Fragments are passed to `on_fragment` as they arrive. The stored answer
    /// is the full reply, or [`EMPTY_REPLY_MESSAGE`] if it was blank. Nothing is
    /// recorded when the request fails.
    pub async fn ask_with_history<F>(
        &self,
        events: &[Event],
        history: &mut ChatHistory,
        question: &str,
        mut on_fragment: F,
    ) -> Result<(String, SummaryStats)>
    where
        F: FnMut(&str),
    {
        let reply = self.ask(events, &history.messages(), question).await?;
        let stats = reply.stats.clone();

        let mut stream = reply.stream;
        let mut text = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            on_fragment(&fragment);
            text.push_str(&fragment);
        }

        let answer = reply_or_fallback(&text);
        history.push(ChatMessage::user(question));
        history.push(ChatMessage::assistant(answer.clone()));
        Ok((answer, stats))
    }
}

/// A stored chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Chat history persisted as a JSON array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatHistory {
    entries: Vec<HistoryEntry>,
}

impl ChatHistory {
    /// History file kept next to an event store: `walletfy.json` → `walletfy.chat.json`
    pub fn path_for_store(store_path: &Path) -> PathBuf {
        let stem = store_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "walletfy".to_string());
        store_path.with_file_name(format!("{}.chat.json", stem))
    }

    /// Load from `path`; a missing or unreadable file is an empty history
    pub fn load(path: &Path) -> Self {
        let entries = fs::read_to_string(path)
            .ok()
            .and_then(|content| match serde_json::from_str(&content) {
                Ok(entries) => Some(entries),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt chat history");
                    None
                }
            })
            .unwrap_or_default();
        Self { entries }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(&self.entries)?;
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(json.as_bytes())?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Delete the history file if present
    pub fn clear(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(HistoryEntry {
            role: message.role,
            content: message.content,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entries as chat messages, oldest first
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|e| ChatMessage {
                role: e.role,
                content: e.content.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
