//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_store` - Shared utility to open the event store
//! - `load_config` - Assistant and display configuration
//! - `cmd_init` - Create the store, optionally with demo events
//! - `cmd_balance` - Show or set the initial balance

use std::path::Path;

use anyhow::{Context, Result};
use walletfy_core::{AssistantConfig, EventStore};

use super::format_amount;

/// Open the event store at `store_path`
pub fn open_store(store_path: &Path) -> Result<EventStore> {
    EventStore::open(store_path)
        .with_context(|| format!("Failed to open store: {}", store_path.display()))
}

/// Load configuration from the override file or embedded defaults
pub fn load_config() -> Result<AssistantConfig> {
    AssistantConfig::load().context("Failed to load configuration")
}

pub fn cmd_init(store_path: &Path, demo: bool) -> Result<()> {
    println!("🔧 Initializing store at {}...", store_path.display());

    let mut store = open_store(store_path)?;
    if !store.exists() {
        store.save().context("Failed to create store")?;
    }

    if demo {
        let seeded = store
            .seed_demo_events_if_empty()
            .context("Failed to seed demo events")?;
        if seeded > 0 {
            println!("   Seeded {} demo events", seeded);
        } else {
            println!("   Store already has events, demo data skipped");
        }
    }

    println!("✅ Store ready ({} events)", store.list_events().len());
    println!();
    println!("Next steps:");
    println!("  1. Add events: walletfy events add --name Salary --amount 1000 --date 2025-01-05 --kind income");
    println!("  2. Import a CSV: walletfy import --file events.csv");
    println!("  3. Ask a question: walletfy ask \"Which month did I spend the most?\"");

    Ok(())
}

pub fn cmd_balance(store_path: &Path, amount: Option<f64>) -> Result<()> {
    let mut store = open_store(store_path)?;

    match amount {
        Some(amount) => {
            store
                .set_initial_balance(amount)
                .context("Failed to set initial balance")?;
            println!("✅ Initial balance set to {}", format_amount(amount));
        }
        None => {
            println!("Initial balance: {}", format_amount(store.initial_balance()));
        }
    }

    Ok(())
}
