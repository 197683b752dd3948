//! Walletfy CLI - Personal income and expense tracker
//!
//! Usage:
//!   walletfy init --demo          Create the store with demo events
//!   walletfy import --file CSV    Import events
//!   walletfy months               Monthly totals with running balance
//!   walletfy ask "How am I doing?" Ask the financial assistant

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init { demo } => commands::cmd_init(&cli.store, demo),
        Commands::Events { action } => match action {
            None => commands::cmd_events_list(&cli.store, None),
            Some(EventsAction::List { search }) => {
                commands::cmd_events_list(&cli.store, search.as_deref())
            }
            Some(EventsAction::Show { id }) => commands::cmd_events_show(&cli.store, &id),
            Some(EventsAction::Add {
                name,
                amount,
                date,
                kind,
                description,
                attachment,
            }) => commands::cmd_events_add(
                &cli.store,
                &name,
                amount,
                &date,
                &kind,
                description,
                attachment,
            ),
            Some(EventsAction::Update {
                id,
                name,
                amount,
                date,
                kind,
                description,
                attachment,
            }) => {
                let kind = kind
                    .as_deref()
                    .map(str::parse::<walletfy_core::EventKind>)
                    .transpose()
                    .map_err(|e: String| anyhow::anyhow!(e))?;
                let update = walletfy_core::EventUpdate {
                    name,
                    description,
                    amount,
                    date,
                    kind,
                    attachment,
                };
                commands::cmd_events_update(&cli.store, &id, &update)
            }
            Some(EventsAction::Delete { id }) => commands::cmd_events_delete(&cli.store, &id),
        },
        Commands::Import { file } => commands::cmd_import(&cli.store, &file),
        Commands::Balance { amount } => commands::cmd_balance(&cli.store, amount),
        Commands::Months { search } => commands::cmd_months(&cli.store, search.as_deref()),
        Commands::Summary { budget, json } => commands::cmd_summary(&cli.store, budget, json),
        Commands::Ask { question, history } => {
            commands::cmd_ask(&cli.store, &question, history).await
        }
        Commands::History { action } => match action {
            None | Some(HistoryAction::Show) => commands::cmd_history_show(&cli.store),
            Some(HistoryAction::Clear) => commands::cmd_history_clear(&cli.store),
        },
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
