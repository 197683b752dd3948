//! Monthly view command implementation

use std::path::Path;

use anyhow::Result;
use walletfy_core::{filter_by_period, group_by_month, Event};

use super::{format_amount, load_config, open_store, truncate};

/// Show events grouped by month with totals and running balance
///
/// With `--search` only matching events are grouped; the running balance then
/// covers just those events.
pub fn cmd_months(store_path: &Path, search: Option<&str>) -> Result<()> {
    let store = open_store(store_path)?;
    let config = load_config()?;

    let events: Vec<Event> = filter_by_period(store.list_events(), search.unwrap_or(""), config.locale)
        .into_iter()
        .cloned()
        .collect();
    let buckets = group_by_month(&events, store.initial_balance(), config.locale);

    if buckets.is_empty() {
        println!("No events to show.");
        return Ok(());
    }

    println!("Initial balance: {}", format_amount(store.initial_balance()));

    for bucket in &buckets {
        println!();
        println!("📅 {}", bucket.month_label);
        println!("   ─────────────────────────────");
        for event in &bucket.events {
            let sign = if event.is_income() { "+" } else { "-" };
            println!(
                "   {:<10} {:<20} {}{:>11}",
                event.date,
                truncate(&event.name, 20),
                sign,
                format_amount(event.amount)
            );
        }
        println!("   Income:   {:>12}", format_amount(bucket.income));
        println!("   Expense:  {:>12}", format_amount(bucket.expense));
        println!("   Month:    {:>12}", format_amount(bucket.month_balance));
        println!("   Balance:  {:>12}", format_amount(bucket.running_balance));
    }

    Ok(())
}
