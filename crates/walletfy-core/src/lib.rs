//! Walletfy Core Library
//!
//! Shared functionality for the Walletfy personal finance tool:
//! - Event model, validation and a JSON file store
//! - Monthly grouping with running balances and localized labels
//! - CSV import of income and expense events
//! - Financial summaries fitted to a size budget for LLM context
//! - Pluggable chat backends (Ollama, mock) with streamed replies
//! - Financial Q&A assistant with context-overflow retry and chat history
//! - Prompt library for customizable AI prompts

pub mod aggregate;
pub mod ai;
pub mod assistant;
pub mod config;
pub mod dates;
pub mod error;
pub mod import;
pub mod models;
pub mod money;
pub mod prompts;
pub mod search;
pub mod shrink;
pub mod store;
pub mod summary;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use aggregate::{group_by_month, MonthBucket, INVALID_DATE_LABEL};
pub use ai::{
    AIClient, ChatBackend, ChatMessage, ChatOutcome, ChatRequest, MockBackend, OllamaBackend,
    Role, SamplingOptions, TextStream,
};
pub use assistant::{
    Assistant, AssistantReply, ChatHistory, ContextPlan, HistoryEntry, EMPTY_REPLY_MESSAGE,
};
pub use config::{AssistantConfig, ContextConfig, ContextLimits, ModelConfig};
pub use dates::{Locale, MonthKey};
pub use error::{Error, Result};
pub use import::parse_events_csv;
pub use models::{Event, EventKind, EventUpdate, NewEvent};
pub use money::round2;
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use search::filter_by_period;
pub use shrink::{BudgetShrinker, CharRatioEstimator, DegradationMode, SizeEstimator};
pub use store::EventStore;
pub use summary::{
    summarize, FinancialSummary, SummaryBuilder, SummaryPayload, SummaryStats,
    DEFAULT_SIZE_BUDGET,
};
