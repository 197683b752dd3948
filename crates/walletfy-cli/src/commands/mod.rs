//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Store setup (init, balance) and shared utilities (open_store)
//! - `events` - Event commands (list, show, add, update, delete)
//! - `import` - CSV import
//! - `months` - Monthly grouping with running balance
//! - `summary` - Financial summary as sent to the assistant
//! - `assistant` - Assistant questions and saved conversation
//! - `prompts` - Prompt library management commands

pub mod assistant;
pub mod core;
pub mod events;
pub mod import;
pub mod months;
pub mod prompts;
pub mod summary;

// Re-export command functions for main.rs
pub use assistant::*;
pub use core::*;
pub use events::*;
pub use import::*;
pub use months::*;
pub use prompts::*;
pub use summary::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount with two decimals
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", walletfy_core::round2(amount))
}
