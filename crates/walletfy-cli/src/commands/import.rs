//! Import command implementation

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use walletfy_core::import::parse_events_csv;

use super::open_store;

pub fn cmd_import(store_path: &Path, file: &Path) -> Result<()> {
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;

    println!("📥 Importing events from {}...", file.display());

    let new_events = parse_events_csv(BufReader::new(csv_file))
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    if new_events.is_empty() {
        println!("   No events found in file");
        return Ok(());
    }

    let mut store = open_store(store_path)?;
    let created = store
        .create_events(new_events)
        .context("Failed to save imported events")?;

    let income = created.iter().filter(|e| e.is_income()).count();
    println!(
        "✅ Imported {} events ({} income, {} expense)",
        created.len(),
        income,
        created.len() - income
    );

    Ok(())
}
