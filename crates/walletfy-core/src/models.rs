//! Domain models for Walletfy

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::parse_event_date;
use crate::error::{Error, Result};

/// Maximum characters allowed in an event name
pub const MAX_NAME_LEN: usize = 20;

/// Maximum characters allowed in an event description
pub const MAX_DESCRIPTION_LEN: usize = 100;

/// Direction of money for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Income,
    Expense,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" | "ingreso" => Ok(Self::Income),
            "expense" | "egreso" => Ok(Self::Expense),
            _ => Err(format!(
                "Unknown event kind: {} (valid: income, expense)",
                s
            )),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single dated income or expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Always positive; the direction comes from `kind`
    pub amount: f64,
    /// ISO 8601 date as entered
    pub date: String,
    pub kind: EventKind,
    /// Base64 attachment (receipt photo, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl Event {
    /// Create an event without description or attachment
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: f64,
        date: impl Into<String>,
        kind: EventKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            amount,
            date: date.into(),
            kind,
            attachment: None,
        }
    }

    /// Build a stored event from validated input
    pub fn from_new(id: impl Into<String>, new: NewEvent) -> Self {
        Self {
            id: id.into(),
            name: new.name,
            description: new.description,
            amount: new.amount,
            date: new.date,
            kind: new.kind,
            attachment: new.attachment,
        }
    }

    /// Calendar date, or None if `date` is not parseable
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_event_date(&self.date)
    }

    pub fn is_income(&self) -> bool {
        self.kind == EventKind::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == EventKind::Expense
    }
}

/// Input for creating an event (id is assigned by the store)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: f64,
    pub date: String,
    pub kind: EventKind,
    #[serde(default)]
    pub attachment: Option<String>,
}

impl NewEvent {
    /// Check the same constraints the event form enforces
    pub fn validate(&self) -> Result<()> {
        validate_fields(
            &self.name,
            self.description.as_deref(),
            self.amount,
            &self.date,
        )
    }
}

/// Partial update of an event; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub kind: Option<EventKind>,
    pub attachment: Option<String>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.kind.is_none()
            && self.attachment.is_none()
    }

    /// Merge into `event`, returning the updated copy after validation
    pub fn apply_to(&self, event: &Event) -> Result<Event> {
        let mut updated = event.clone();
        if let Some(ref name) = self.name {
            updated.name = name.clone();
        }
        if let Some(ref description) = self.description {
            updated.description = Some(description.clone());
        }
        if let Some(amount) = self.amount {
            updated.amount = amount;
        }
        if let Some(ref date) = self.date {
            updated.date = date.clone();
        }
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(ref attachment) = self.attachment {
            updated.attachment = Some(attachment.clone());
        }

        validate_fields(
            &updated.name,
            updated.description.as_deref(),
            updated.amount,
            &updated.date,
        )?;
        Ok(updated)
    }
}

fn validate_fields(name: &str, description: Option<&str>, amount: f64, date: &str) -> Result<()> {
    let name_len = name.trim().chars().count();
    if name_len == 0 {
        return Err(Error::InvalidEvent("name must not be empty".into()));
    }
    if name_len > MAX_NAME_LEN {
        return Err(Error::InvalidEvent(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(Error::InvalidEvent(format!(
                "description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
    }
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidEvent(format!(
            "amount must be a positive number, got {}",
            amount
        )));
    }
    if parse_event_date(date).is_none() {
        return Err(Error::InvalidEvent(format!("invalid date: {}", date)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_event() -> NewEvent {
        NewEvent {
            name: "Salary".to_string(),
            description: Some("Monthly pay".to_string()),
            amount: 1500.0,
            date: "2025-01-05".to_string(),
            kind: EventKind::Income,
            attachment: None,
        }
    }

    #[test]
    fn test_event_kind_from_str() {
        assert_eq!("income".parse::<EventKind>().unwrap(), EventKind::Income);
        assert_eq!("EXPENSE".parse::<EventKind>().unwrap(), EventKind::Expense);
        assert_eq!("egreso".parse::<EventKind>().unwrap(), EventKind::Expense);
        assert!("transfer".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_event_json_shape() {
        let event = Event::new("evt1", "Rent", 600.0, "2024-12-10", EventKind::Expense);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "expense");
        assert_eq!(json["amount"], 600.0);
        assert!(json.get("description").is_none());
        assert!(json.get("attachment").is_none());

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_new_event_validation() {
        assert!(new_event().validate().is_ok());

        let mut empty_name = new_event();
        empty_name.name = "   ".to_string();
        assert!(empty_name.validate().is_err());

        let mut long_name = new_event();
        long_name.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(long_name.validate().is_err());

        let mut zero = new_event();
        zero.amount = 0.0;
        assert!(zero.validate().is_err());

        let mut bad_date = new_event();
        bad_date.date = "not a date".to_string();
        assert!(bad_date.validate().is_err());
    }

    #[test]
    fn test_update_merges_fields() {
        let event = Event::new("evt1", "Rent", 600.0, "2024-12-10", EventKind::Expense);
        let update = EventUpdate {
            amount: Some(650.0),
            description: Some("Raised".to_string()),
            ..Default::default()
        };

        let updated = update.apply_to(&event).unwrap();
        assert_eq!(updated.amount, 650.0);
        assert_eq!(updated.description.as_deref(), Some("Raised"));
        assert_eq!(updated.name, "Rent");
        assert_eq!(updated.id, "evt1");
    }

    #[test]
    fn test_update_rejects_invalid_result() {
        let event = Event::new("evt1", "Rent", 600.0, "2024-12-10", EventKind::Expense);
        let update = EventUpdate {
            amount: Some(-5.0),
            ..Default::default()
        };
        assert!(update.apply_to(&event).is_err());
        assert!(EventUpdate::default().is_empty());
    }

    #[test]
    fn test_parsed_date() {
        let ok = Event::new("a", "A", 1.0, "2025-03-15", EventKind::Income);
        assert_eq!(ok.parsed_date(), NaiveDate::from_ymd_opt(2025, 3, 15));

        let bad = Event::new("b", "B", 1.0, "2025-13-40", EventKind::Income);
        assert!(bad.parsed_date().is_none());
    }
}
