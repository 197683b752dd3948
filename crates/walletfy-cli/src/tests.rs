//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::path::PathBuf;

use chrono::Utc;
use tempfile::TempDir;
use walletfy_core::{
    AssistantConfig, ChatHistory, ChatMessage, EventKind, EventStore, EventUpdate, MockBackend,
    PromptLibrary, Role,
};

use crate::commands::{self, format_amount, truncate};

/// Temp dir holding a store path (the file is not created)
fn setup_store_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("walletfy.json");
    (dir, path)
}

/// Temp store seeded with the demo events
fn setup_demo_store() -> (TempDir, PathBuf) {
    let (dir, path) = setup_store_path();
    commands::cmd_init(&path, true).unwrap();
    (dir, path)
}

// ========== Init / Balance Tests ==========

#[test]
fn test_cmd_init_creates_store() {
    let (_dir, path) = setup_store_path();
    commands::cmd_init(&path, false).unwrap();

    assert!(path.exists());
    assert!(EventStore::open(&path).unwrap().list_events().is_empty());
}

#[test]
fn test_cmd_init_demo_only_seeds_empty_store() {
    let (_dir, path) = setup_demo_store();
    let seeded = EventStore::open(&path).unwrap().list_events().len();
    assert_eq!(seeded, 24);

    commands::cmd_init(&path, true).unwrap();
    assert_eq!(EventStore::open(&path).unwrap().list_events().len(), seeded);
}

#[test]
fn test_cmd_balance_set_and_show() {
    let (_dir, path) = setup_store_path();
    commands::cmd_balance(&path, Some(-150.5)).unwrap();
    assert_eq!(EventStore::open(&path).unwrap().initial_balance(), -150.5);

    assert!(commands::cmd_balance(&path, None).is_ok());
}

// ========== Events Command Tests ==========

#[test]
fn test_cmd_events_add() {
    let (_dir, path) = setup_store_path();
    commands::cmd_events_add(
        &path,
        "Salary",
        1000.0,
        "2025-01-05",
        "income",
        Some("January pay".into()),
        None,
    )
    .unwrap();

    let store = EventStore::open(&path).unwrap();
    let events = store.list_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Income);
    assert_eq!(events[0].description.as_deref(), Some("January pay"));
}

#[test]
fn test_cmd_events_add_invalid_kind() {
    let (_dir, path) = setup_store_path();
    let result =
        commands::cmd_events_add(&path, "Salary", 1000.0, "2025-01-05", "gift", None, None);
    assert!(result.is_err());
}

#[test]
fn test_cmd_events_add_rejects_invalid_event() {
    let (_dir, path) = setup_store_path();
    let result = commands::cmd_events_add(&path, "Rent", -5.0, "2025-01-05", "expense", None, None);
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("amount"));
    assert!(EventStore::open(&path).unwrap().list_events().is_empty());
}

#[test]
fn test_cmd_events_list_and_search() {
    let (_dir, path) = setup_demo_store();
    assert!(commands::cmd_events_list(&path, None).is_ok());
    assert!(commands::cmd_events_list(&path, Some("march")).is_ok());
    assert!(commands::cmd_events_list(&path, Some("1999")).is_ok());
}

#[test]
fn test_cmd_events_update() {
    let (_dir, path) = setup_demo_store();
    let update = EventUpdate {
        amount: Some(99.0),
        kind: Some(EventKind::Expense),
        ..Default::default()
    };
    commands::cmd_events_update(&path, "evt1", &update).unwrap();

    let store = EventStore::open(&path).unwrap();
    let event = store.get_event("evt1").unwrap();
    assert_eq!(event.amount, 99.0);
    assert_eq!(event.kind, EventKind::Expense);
}

#[test]
fn test_cmd_events_update_requires_fields() {
    let (_dir, path) = setup_demo_store();
    let result = commands::cmd_events_update(&path, "evt1", &EventUpdate::default());
    assert!(result.unwrap_err().to_string().contains("Nothing to update"));
}

#[test]
fn test_cmd_events_show_and_delete() {
    let (_dir, path) = setup_demo_store();
    assert!(commands::cmd_events_show(&path, "evt2").is_ok());

    commands::cmd_events_delete(&path, "evt2").unwrap();
    let store = EventStore::open(&path).unwrap();
    assert!(store.get_event("evt2").is_err());
    assert_eq!(store.list_events().len(), 23);

    let result = commands::cmd_events_delete(&path, "evt2");
    assert!(format!("{:#}", result.unwrap_err()).contains("Not found"));
}

// ========== Import Tests ==========

#[test]
fn test_cmd_import() {
    let (dir, path) = setup_store_path();
    let csv_path = dir.path().join("events.csv");
    std::fs::write(
        &csv_path,
        "name,amount,date,kind\nSalary,1000,2025-01-05,income\nRent,400,2025-01-10,expense\n",
    )
    .unwrap();

    commands::cmd_import(&path, &csv_path).unwrap();
    assert_eq!(EventStore::open(&path).unwrap().list_events().len(), 2);
}

#[test]
fn test_cmd_import_bad_row_imports_nothing() {
    let (dir, path) = setup_store_path();
    let csv_path = dir.path().join("events.csv");
    std::fs::write(
        &csv_path,
        "name,amount,date,kind\nSalary,1000,2025-01-05,income\nRent,abc,2025-01-10,expense\n",
    )
    .unwrap();

    assert!(commands::cmd_import(&path, &csv_path).is_err());
    assert!(EventStore::open(&path).unwrap().list_events().is_empty());
}

#[test]
fn test_cmd_import_missing_file() {
    let (dir, path) = setup_store_path();
    let result = commands::cmd_import(&path, &dir.path().join("nope.csv"));
    assert!(result.unwrap_err().to_string().contains("Failed to open file"));
}

// ========== Months / Summary Tests ==========

#[test]
fn test_cmd_months() {
    let (_dir, path) = setup_demo_store();
    assert!(commands::cmd_months(&path, None).is_ok());
    assert!(commands::cmd_months(&path, Some("2025")).is_ok());
}

#[test]
fn test_cmd_months_empty_store() {
    let (_dir, path) = setup_store_path();
    assert!(commands::cmd_months(&path, None).is_ok());
}

#[test]
fn test_cmd_summary() {
    let (_dir, path) = setup_demo_store();
    assert!(commands::cmd_summary(&path, None, false).is_ok());
    assert!(commands::cmd_summary(&path, Some(200), false).is_ok());
    assert!(commands::cmd_summary(&path, None, true).is_ok());
}

// ========== Assistant Tests ==========

#[tokio::test]
async fn test_run_ask_records_history() {
    let (_dir, path) = setup_demo_store();
    let mut library = PromptLibrary::embedded_only();
    let config = AssistantConfig::default();
    let backend = MockBackend::new().with_reply(["Your ", "balance ", "grew."]);

    let answer = commands::run_ask(&path, backend.clone(), &mut library, &config, "Trend?", true)
        .await
        .unwrap();
    assert_eq!(answer.as_deref(), Some("Your balance grew."));

    let history = ChatHistory::load(&ChatHistory::path_for_store(&path));
    assert_eq!(history.len(), 2);
    assert_eq!(history.entries()[0].role, Role::User);
    assert!(history.entries()[1].timestamp <= Utc::now());

    // The second question carries the first exchange
    commands::run_ask(&path, backend.clone(), &mut library, &config, "Why?", true)
        .await
        .unwrap();
    let second = &backend.requests()[1];
    assert_eq!(second.messages.len(), 4);
    assert_eq!(second.messages[1], ChatMessage::user("Trend?"));
}

#[tokio::test]
async fn test_run_ask_without_history_saves_nothing() {
    let (_dir, path) = setup_demo_store();
    let mut library = PromptLibrary::embedded_only();
    let config = AssistantConfig::default();

    let answer = commands::run_ask(&path, MockBackend::new(), &mut library, &config, "Q?", false)
        .await
        .unwrap();
    assert!(answer.is_some_and(|a| a.contains("Balance")));
    assert!(!ChatHistory::path_for_store(&path).exists());
}

#[tokio::test]
async fn test_run_ask_empty_store() {
    let (_dir, path) = setup_store_path();
    let mut library = PromptLibrary::embedded_only();
    let config = AssistantConfig::default();
    let backend = MockBackend::new();

    let answer = commands::run_ask(&path, backend.clone(), &mut library, &config, "Q?", true)
        .await
        .unwrap();
    assert!(answer.is_none());
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_run_ask_context_exceeded() {
    let (_dir, path) = setup_demo_store();
    let mut library = PromptLibrary::embedded_only();
    let config = AssistantConfig::default();
    let backend = MockBackend::new().with_context_limit(5);

    let result =
        commands::run_ask(&path, backend.clone(), &mut library, &config, "Q?", true).await;
    assert!(result.unwrap_err().to_string().contains("context window"));
    assert_eq!(backend.call_count(), 2);
    assert!(!ChatHistory::path_for_store(&path).exists());
}

#[tokio::test]
async fn test_run_ask_rejects_blank_question() {
    let (_dir, path) = setup_demo_store();
    let mut library = PromptLibrary::embedded_only();
    let result = commands::run_ask(
        &path,
        MockBackend::new(),
        &mut library,
        &AssistantConfig::default(),
        "   ",
        false,
    )
    .await;
    assert!(result.is_err());
}

#[test]
fn test_cmd_history_show_and_clear() {
    let (_dir, path) = setup_store_path();
    let history_path = ChatHistory::path_for_store(&path);

    assert!(commands::cmd_history_show(&path).is_ok());

    let mut history = ChatHistory::default();
    history.push(ChatMessage::user("hi"));
    history.push(ChatMessage::assistant("hello"));
    history.save(&history_path).unwrap();

    assert!(commands::cmd_history_show(&path).is_ok());
    commands::cmd_history_clear(&path).unwrap();
    assert!(!history_path.exists());
}

// ========== Prompts Tests ==========

#[test]
fn test_cmd_prompts() {
    assert!(commands::cmd_prompts_list().is_ok());
    assert!(commands::cmd_prompts_show("financial_assistant").is_ok());
    assert!(commands::cmd_prompts_show("unknown").is_ok());
    assert!(commands::cmd_prompts_path().is_ok());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a rather long name", 10), "a rathe...");
    assert_eq!(truncate("café crème brûlée", 8), "café ...");
}

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(1234.5), "1234.50");
    assert_eq!(format_amount(0.1 + 0.2), "0.30");
    assert_eq!(format_amount(-0.0), "0.00");
}
