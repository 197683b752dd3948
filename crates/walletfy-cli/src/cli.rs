//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Walletfy - Track income and expenses, ask questions about them
#[derive(Parser)]
#[command(name = "walletfy")]
#[command(about = "Personal income and expense tracker with a local AI assistant", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Event store path
    #[arg(long, default_value = "walletfy.json", global = true)]
    pub store: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the event store
    Init {
        /// Seed demo events when the store is empty
        #[arg(long)]
        demo: bool,
    },

    /// Manage events (list, show, add, update, delete)
    Events {
        #[command(subcommand)]
        action: Option<EventsAction>,
    },

    /// Import events from CSV
    Import {
        /// CSV file with name, amount, date and kind columns
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show or set the initial balance
    Balance {
        /// New initial balance
        #[arg(allow_negative_numbers = true)]
        amount: Option<f64>,
    },

    /// Show events grouped by month with running balance
    Months {
        /// Only events whose month, year or "month year" match
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show the financial summary sent to the assistant
    Summary {
        /// Size budget for the payload (estimated tokens)
        #[arg(short, long)]
        budget: Option<usize>,

        /// Print the payload JSON instead of stats
        #[arg(long)]
        json: bool,
    },

    /// Ask the financial assistant a question
    Ask {
        /// The question
        question: String,

        /// Continue the saved conversation and record this exchange
        #[arg(long)]
        history: bool,
    },

    /// Manage the saved assistant conversation
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Manage AI prompts (list, show, path)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum EventsAction {
    /// List events
    List {
        /// Only events whose month, year or "month year" match
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one event
    Show {
        /// Event ID
        id: String,
    },

    /// Add an event
    Add {
        /// Name (at most 20 characters)
        #[arg(short, long)]
        name: String,

        /// Amount (positive)
        #[arg(short, long)]
        amount: f64,

        /// Date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,

        /// Kind: income or expense
        #[arg(short, long)]
        kind: String,

        /// Description (at most 100 characters)
        #[arg(long)]
        description: Option<String>,

        /// Attachment (image data URL or path)
        #[arg(long)]
        attachment: Option<String>,
    },

    /// Update fields of an event
    Update {
        /// Event ID
        id: String,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        amount: Option<f64>,

        #[arg(short, long)]
        date: Option<String>,

        #[arg(short, long)]
        kind: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        attachment: Option<String>,
    },

    /// Delete an event
    Delete {
        /// Event ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Print the conversation
    Show,

    /// Delete the conversation
    Clear,
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Prompt ID (e.g., financial_assistant)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
