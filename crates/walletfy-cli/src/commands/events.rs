//! Event command implementations

use std::path::Path;

use anyhow::{Context, Result};
use walletfy_core::{filter_by_period, Event, EventKind, EventUpdate, NewEvent};

use super::{format_amount, load_config, open_store, truncate};

/// List events, optionally filtered by period
pub fn cmd_events_list(store_path: &Path, search: Option<&str>) -> Result<()> {
    let store = open_store(store_path)?;
    let config = load_config()?;

    let events = filter_by_period(store.list_events(), search.unwrap_or(""), config.locale);

    if events.is_empty() {
        match search {
            Some(query) => println!("No events match '{}'.", query),
            None => println!("No events yet. Add one with: walletfy events add"),
        }
        return Ok(());
    }

    println!(
        "{:<38} {:<10} {:<20} {:>12}  {:<7}  {}",
        "ID", "DATE", "NAME", "AMOUNT", "KIND", "DESCRIPTION"
    );
    println!("{}", "-".repeat(110));

    for event in &events {
        println!(
            "{:<38} {:<10} {:<20} {:>12}  {:<7}  {}",
            event.id,
            event.date,
            truncate(&event.name, 20),
            format_amount(event.amount),
            event.kind,
            truncate(event.description.as_deref().unwrap_or(""), 30),
        );
    }

    println!();
    println!("{} event(s)", events.len());

    Ok(())
}

pub fn cmd_events_show(store_path: &Path, id: &str) -> Result<()> {
    let store = open_store(store_path)?;
    let event = store.get_event(id)?;
    print_event(event);
    Ok(())
}

pub fn cmd_events_add(
    store_path: &Path,
    name: &str,
    amount: f64,
    date: &str,
    kind: &str,
    description: Option<String>,
    attachment: Option<String>,
) -> Result<()> {
    let kind: EventKind = kind.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let mut store = open_store(store_path)?;
    let event = store
        .create_event(NewEvent {
            name: name.to_string(),
            description,
            amount,
            date: date.to_string(),
            kind,
            attachment,
        })
        .context("Failed to add event")?;

    println!("✅ Added event {}", event.id);
    print_event(&event);
    Ok(())
}

pub fn cmd_events_update(store_path: &Path, id: &str, update: &EventUpdate) -> Result<()> {
    if update.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one of --name, --amount, --date, --kind, --description, --attachment");
    }

    let mut store = open_store(store_path)?;
    let event = store
        .update_event(id, update)
        .with_context(|| format!("Failed to update event {}", id))?;

    println!("✅ Updated event {}", event.id);
    print_event(&event);
    Ok(())
}

pub fn cmd_events_delete(store_path: &Path, id: &str) -> Result<()> {
    let mut store = open_store(store_path)?;
    let event = store
        .delete_event(id)
        .with_context(|| format!("Failed to delete event {}", id))?;

    println!("🗑️  Deleted '{}' ({} {})", event.name, event.kind, format_amount(event.amount));
    Ok(())
}

fn print_event(event: &Event) {
    println!("   ID:          {}", event.id);
    println!("   Name:        {}", event.name);
    println!("   Amount:      {}", format_amount(event.amount));
    println!("   Kind:        {}", event.kind);
    println!("   Date:        {}", event.date);
    if let Some(ref description) = event.description {
        println!("   Description: {}", description);
    }
    if let Some(ref attachment) = event.attachment {
        println!("   Attachment:  {}", truncate(attachment, 60));
    }
}
