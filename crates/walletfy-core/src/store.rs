//! JSON file event store
//!
//! Holds every event plus the user's initial balance in a single JSON file:
//!
//! ```json
//! { "initialBalance": 250.0, "events": [ ... ] }
//! ```
//!
//! A missing file opens as an empty store. Every mutation rewrites the whole
//! file through a temp file in the same directory, so a crash never leaves a
//! half-written store behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Event, EventKind, EventUpdate, NewEvent};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreData {
    #[serde(default)]
    initial_balance: f64,
    #[serde(default)]
    events: Vec<Event>,
}

/// File-backed collection of events
#[derive(Debug)]
pub struct EventStore {
    path: PathBuf,
    data: StoreData,
}

impl EventStore {
    /// Open the store at `path`, or start empty if the file does not exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                StoreData::default()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::InvalidData(format!("Corrupt store {}: {}", path.display(), e))
                })?
            }
        } else {
            StoreData::default()
        };

        if !data.initial_balance.is_finite() {
            return Err(Error::InvalidData(format!(
                "Corrupt store {}: initial balance is not a number",
                path.display()
            )));
        }

        debug!(
            path = %path.display(),
            events = data.events.len(),
            "Opened event store"
        );
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// All events in insertion order
    pub fn list_events(&self) -> &[Event] {
        &self.data.events
    }

    pub fn get_event(&self, id: &str) -> Result<&Event> {
        self.data
            .events
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("event {}", id)))
    }

    /// Validate and append a new event with a fresh id
    pub fn create_event(&mut self, new: NewEvent) -> Result<Event> {
        new.validate()?;
        let event = Event::from_new(Uuid::new_v4().to_string(), new);
        self.data.events.push(event.clone());
        self.save()?;

        info!(id = %event.id, kind = event.kind.as_str(), "Created event");
        Ok(event)
    }

    /// Validate and append several events in one write
    pub fn create_events(&mut self, new_events: Vec<NewEvent>) -> Result<Vec<Event>> {
        for new in &new_events {
            new.validate()?;
        }
        let created: Vec<Event> = new_events
            .into_iter()
            .map(|new| Event::from_new(Uuid::new_v4().to_string(), new))
            .collect();
        self.data.events.extend(created.iter().cloned());
        self.save()?;

        info!(count = created.len(), "Created events");
        Ok(created)
    }

    /// Merge `update` into the event with `id`
    pub fn update_event(&mut self, id: &str, update: &EventUpdate) -> Result<Event> {
        let slot = self
            .data
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("event {}", id)))?;

        let updated = update.apply_to(slot)?;
        *slot = updated.clone();
        self.save()?;

        info!(id, "Updated event");
        Ok(updated)
    }

    pub fn delete_event(&mut self, id: &str) -> Result<Event> {
        let index = self
            .data
            .events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("event {}", id)))?;

        let removed = self.data.events.remove(index);
        self.save()?;

        info!(id, "Deleted event");
        Ok(removed)
    }

    pub fn initial_balance(&self) -> f64 {
        self.data.initial_balance
    }

    pub fn set_initial_balance(&mut self, amount: f64) -> Result<()> {
        if !amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "initial balance must be a number, got {}",
                amount
            )));
        }
        self.data.initial_balance = amount;
        self.save()
    }

    /// Add the demo events if the store has none; returns how many were added
    pub fn seed_demo_events_if_empty(&mut self) -> Result<usize> {
        if !self.data.events.is_empty() {
            return Ok(0);
        }
        self.data.events = demo_events();
        self.save()?;

        info!(count = self.data.events.len(), "Seeded demo events");
        Ok(self.data.events.len())
    }

    /// Write the store atomically
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(&self.data)?;
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        debug!(path = %self.path.display(), events = self.data.events.len(), "Saved event store");
        Ok(())
    }
}

/// Sample data covering December 2024 to July 2025
pub fn demo_events() -> Vec<Event> {
    use EventKind::{Expense, Income};

    let rows: [(&str, &str, Option<&str>, f64, &str, EventKind); 24] = [
        ("evt1", "December salary", Some("Monthly pay"), 1500.0, "2024-12-05", Income),
        ("evt2", "December rent", Some("Rent payment"), 600.0, "2024-12-10", Expense),
        ("evt3", "December groceries", None, 300.0, "2024-12-15", Expense),
        ("evt4", "January freelance", Some("Web project"), 800.0, "2025-01-10", Income),
        ("evt5", "January power", Some("Utility bill"), 90.0, "2025-01-15", Expense),
        ("evt6", "January salary", None, 1500.0, "2025-01-25", Income),
        ("evt7", "February salary", None, 1500.0, "2025-02-05", Income),
        ("evt8", "February power", Some("Utility bill"), 120.0, "2025-02-14", Expense),
        ("evt9", "February gas", None, 20.0, "2025-02-18", Expense),
        ("evt10", "March salary", None, 1500.0, "2025-03-05", Income),
        ("evt11", "Netflix March", Some("Monthly subscription"), 20.0, "2025-03-15", Expense),
        ("evt12", "Anniversary dinner", Some("Restaurant"), 100.0, "2025-03-20", Expense),
        ("evt13", "April salary", None, 1500.0, "2025-04-05", Income),
        ("evt14", "Amazon April", Some("Online purchase"), 250.0, "2025-04-10", Expense),
        ("evt15", "Gym membership", Some("Fitness"), 50.0, "2025-04-18", Expense),
        ("evt16", "May salary", None, 1500.0, "2025-05-05", Income),
        ("evt17", "Spotify May", Some("Music subscription"), 10.0, "2025-05-10", Expense),
        ("evt18", "Mother's Day gift", None, 80.0, "2025-05-12", Expense),
        ("evt19", "June salary", None, 1500.0, "2025-06-05", Income),
        ("evt20", "Cinema", Some("Movie night"), 30.0, "2025-06-15", Expense),
        ("evt21", "June taxi", Some("Transport"), 60.0, "2025-06-18", Expense),
        ("evt22", "July salary", None, 1500.0, "2025-07-05", Income),
        ("evt23", "July rent", None, 600.0, "2025-07-10", Expense),
        ("evt24", "Doctor visit", Some("Medical checkup"), 100.0, "2025-07-20", Expense),
    ];

    rows.into_iter()
        .map(|(id, name, description, amount, date, kind)| Event {
            description: description.map(String::from),
            ..Event::new(id, name, amount, date, kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_event(name: &str, amount: f64) -> NewEvent {
        NewEvent {
            name: name.to_string(),
            description: None,
            amount,
            date: "2025-01-05".to_string(),
            kind: EventKind::Expense,
            attachment: None,
        }
    }

    fn temp_store() -> (TempDir, EventStore) {
        let dir = TempDir::new().unwrap();
        let store = EventStore::open(dir.path().join("walletfy.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.list_events().is_empty());
        assert_eq!(store.initial_balance(), 0.0);
        assert!(!store.exists());
    }

    #[test]
    fn test_create_persists_and_reloads() {
        let (dir, mut store) = temp_store();
        let created = store.create_event(new_event("Rent", 600.0)).unwrap();
        store.set_initial_balance(125.5).unwrap();

        let reopened = EventStore::open(dir.path().join("walletfy.json")).unwrap();
        assert_eq!(reopened.list_events(), &[created.clone()]);
        assert_eq!(reopened.initial_balance(), 125.5);
        assert_eq!(reopened.get_event(&created.id).unwrap().name, "Rent");
    }

    #[test]
    fn test_create_rejects_invalid() {
        let (_dir, mut store) = temp_store();
        let err = store.create_event(new_event("", 10.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidEvent(_)));
        assert!(store.list_events().is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let (_dir, mut store) = temp_store();
        let a = store.create_event(new_event("A", 1.0)).unwrap();
        let b = store.create_event(new_event("B", 1.0)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_update_and_delete() {
        let (_dir, mut store) = temp_store();
        let event = store.create_event(new_event("Gym", 50.0)).unwrap();

        let update = EventUpdate {
            amount: Some(55.0),
            ..Default::default()
        };
        let updated = store.update_event(&event.id, &update).unwrap();
        assert_eq!(updated.amount, 55.0);
        assert_eq!(store.get_event(&event.id).unwrap().amount, 55.0);

        let removed = store.delete_event(&event.id).unwrap();
        assert_eq!(removed.id, event.id);
        assert!(matches!(
            store.get_event(&event.id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_ids_are_not_found() {
        let (_dir, mut store) = temp_store();
        assert!(matches!(store.get_event("nope"), Err(Error::NotFound(_))));
        assert!(matches!(
            store.update_event("nope", &EventUpdate::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(store.delete_event("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_invalid_update_leaves_event_untouched() {
        let (_dir, mut store) = temp_store();
        let event = store.create_event(new_event("Gym", 50.0)).unwrap();
        let update = EventUpdate {
            name: Some("x".repeat(40)),
            ..Default::default()
        };
        assert!(store.update_event(&event.id, &update).is_err());
        assert_eq!(store.get_event(&event.id).unwrap().name, "Gym");
    }

    #[test]
    fn test_seed_demo_only_when_empty() {
        let (_dir, mut store) = temp_store();
        assert_eq!(store.seed_demo_events_if_empty().unwrap(), 24);
        assert_eq!(store.seed_demo_events_if_empty().unwrap(), 0);
        assert_eq!(store.list_events().len(), 24);
    }

    #[test]
    fn test_demo_events_are_valid() {
        for event in demo_events() {
            assert!(event.parsed_date().is_some(), "{}", event.id);
            assert!(event.name.chars().count() <= crate::models::MAX_NAME_LEN);
        }
    }

    #[test]
    fn test_corrupt_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("walletfy.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EventStore::open(&path),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_create_events_batch() {
        let (_dir, mut store) = temp_store();
        let created = store
            .create_events(vec![new_event("A", 1.0), new_event("B", 2.0)])
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(store.list_events().len(), 2);

        let bad = store.create_events(vec![new_event("C", 1.0), new_event("D", 0.0)]);
        assert!(bad.is_err());
        assert_eq!(store.list_events().len(), 2);
    }
}
