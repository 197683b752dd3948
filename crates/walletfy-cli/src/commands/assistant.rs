//! Assistant command implementations

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use walletfy_core::{
    AIClient, Assistant, AssistantConfig, ChatBackend, ChatHistory, Error, PromptLibrary, Role,
};

use super::{load_config, open_store};

/// Ask a question with the backend configured through the environment
pub async fn cmd_ask(store_path: &Path, question: &str, use_history: bool) -> Result<()> {
    let config = load_config()?;

    let Some(client) = AIClient::from_env_with_config(&config.model)? else {
        println!("⚠️  No AI backend configured.");
        println!("   💡 Tip: Set OLLAMA_HOST (e.g. http://localhost:11434) to use Ollama");
        println!("   💡 Tip: Set AI_BACKEND=mock to try the assistant without a model");
        return Ok(());
    };

    if !client.health_check().await {
        anyhow::bail!(
            "AI backend at {} is not reachable. Is Ollama running?",
            client.host()
        );
    }

    let mut library = PromptLibrary::new();
    let answer = run_ask(store_path, client, &mut library, &config, question, use_history).await?;
    if answer.is_none() {
        println!("No events yet. Add some before asking the assistant.");
    }
    Ok(())
}

/// Ask `question` over the store's events, streaming the reply to stdout
///
/// Returns the stored answer, or None if the store has no events. With
/// `use_history` the saved conversation is sent along and the exchange is
/// appended to it.
pub async fn run_ask<B: ChatBackend>(
    store_path: &Path,
    backend: B,
    library: &mut PromptLibrary,
    config: &AssistantConfig,
    question: &str,
    use_history: bool,
) -> Result<Option<String>> {
    let question = question.trim();
    if question.is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let store = open_store(store_path)?;
    if store.list_events().is_empty() {
        return Ok(None);
    }

    let history_path = ChatHistory::path_for_store(store_path);
    let mut history = if use_history {
        ChatHistory::load(&history_path)
    } else {
        ChatHistory::default()
    };

    let assistant = Assistant::from_library(backend, library, config)?;
    tracing::debug!(model = assistant.backend().model(), "Using assistant backend");

    let mut stdout = std::io::stdout();
    let result = assistant
        .ask_with_history(store.list_events(), &mut history, question, |fragment| {
            print!("{}", fragment);
            let _ = stdout.flush();
        })
        .await;

    let (answer, stats) = match result {
        Ok(done) => done,
        Err(Error::ContextWindowExceeded(detail)) => {
            anyhow::bail!(
                "The question and your data do not fit the model's context window ({}). \
                 Try `walletfy history clear` or a model with a larger context.",
                detail
            );
        }
        Err(e) => return Err(e).context("Assistant request failed"),
    };
    println!();

    tracing::debug!(
        mode = stats.mode.as_str(),
        months = stats.months_included,
        size_estimate = stats.size_estimate,
        "Answered from summary"
    );

    if use_history {
        history
            .save(&history_path)
            .context("Failed to save chat history")?;
    }

    Ok(Some(answer))
}

pub fn cmd_history_show(store_path: &Path) -> Result<()> {
    let history = ChatHistory::load(&ChatHistory::path_for_store(store_path));

    if history.is_empty() {
        println!("No saved conversation. Start one with: walletfy ask --history \"...\"");
        return Ok(());
    }

    for entry in history.entries() {
        let who = match entry.role {
            Role::User => "🧑 You",
            Role::Assistant => "🤖 Assistant",
            Role::System => "⚙️  System",
        };
        println!("{} ({})", who, entry.timestamp.format("%Y-%m-%d %H:%M"));
        println!("{}", entry.content);
        println!();
    }

    Ok(())
}

pub fn cmd_history_clear(store_path: &Path) -> Result<()> {
    ChatHistory::clear(&ChatHistory::path_for_store(store_path))
        .context("Failed to clear chat history")?;
    println!("✅ Chat history cleared");
    Ok(())
}
