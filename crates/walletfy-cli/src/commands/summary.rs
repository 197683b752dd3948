//! Financial summary command implementation

use std::path::Path;

use anyhow::{Context, Result};
use walletfy_core::SummaryBuilder;

use super::{format_amount, load_config, open_store};

/// Show the summary payload the assistant would receive
///
/// `budget` defaults to the primary context budget from configuration.
pub fn cmd_summary(store_path: &Path, budget: Option<usize>, json: bool) -> Result<()> {
    let store = open_store(store_path)?;
    let config = load_config()?;
    let budget = budget.unwrap_or(config.context.primary.size_budget);

    let summary = SummaryBuilder::new()
        .summarize(store.list_events(), budget)
        .context("Failed to build summary")?;

    if json {
        let pretty = serde_json::to_string_pretty(&summary.payload)?;
        println!("{}", pretty);
        return Ok(());
    }

    let stats = &summary.stats;
    let totals = &summary.payload.totals;

    println!("📊 Financial Summary");
    println!("   ─────────────────────────────");
    println!("   Months:        {} ({})", stats.months_included, stats.months_range);
    println!("   Events:        {}", stats.total_events);
    println!("   Income:        {}", format_amount(totals.income));
    println!("   Expense:       {}", format_amount(totals.expense));
    println!("   Balance:       {}", format_amount(totals.balance));
    println!();
    println!("   Size estimate: {} / {}", stats.size_estimate, budget);
    println!("   Mode:          {}", stats.mode);

    for step in summary.trace.iter().skip(1) {
        if let Some(stage) = step.stage {
            println!("     ↳ {} → {} ({})", stage.as_str(), step.mode, step.size_estimate);
        }
    }

    let highlights = &summary.payload.highlights;
    if let Some(ref month) = highlights.max_expense_month {
        println!();
        println!(
            "   Highest spending month: {} ({})",
            month,
            format_amount(highlights.max_expense)
        );
    }
    if let Some(ref month) = highlights.max_income_month {
        println!(
            "   Highest income month:   {} ({})",
            month,
            format_amount(highlights.max_income)
        );
    }

    Ok(())
}
