//! Monthly grouping with running balances
//!
//! Groups events into calendar-month buckets for display. Each bucket carries
//! its income, expense and balance, plus the running balance threaded from a
//! caller-supplied initial balance across buckets in chronological order.
//!
//! Labels are localized ("March 2025"), but ordering always uses the
//! canonical calendar month so labels never affect sort order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::dates::{month_label, Locale, MonthKey};
use crate::models::{Event, EventKind};

/// Label of the trailing bucket holding events whose date does not parse
pub const INVALID_DATE_LABEL: &str = "Invalid date";

/// Events of one calendar month with their totals
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    pub month_label: String,
    /// None only for the invalid-date bucket
    #[serde(skip)]
    pub month: Option<MonthKey>,
    pub events: Vec<Event>,
    pub income: f64,
    pub expense: f64,
    pub month_balance: f64,
    pub running_balance: f64,
}

/// Group events by calendar month, ordered chronologically
///
/// Events keep their original relative order inside each bucket. Nothing is
/// discarded: events with an unparseable date end up in a final bucket
/// labelled [`INVALID_DATE_LABEL`], which still counts toward the running
/// balance.
pub fn group_by_month(events: &[Event], initial_balance: f64, locale: Locale) -> Vec<MonthBucket> {
    let mut by_month: BTreeMap<MonthKey, Vec<Event>> = BTreeMap::new();
    let mut undated: Vec<Event> = Vec::new();

    for event in events {
        match event.parsed_date() {
            Some(date) => by_month
                .entry(MonthKey::from_date(date))
                .or_default()
                .push(event.clone()),
            None => undated.push(event.clone()),
        }
    }

    if !undated.is_empty() {
        warn!(
            count = undated.len(),
            "Events with unparseable dates grouped under '{}'", INVALID_DATE_LABEL
        );
    }

    let groups = by_month
        .into_iter()
        .map(|(key, events)| (Some(key), month_label(key, locale), events))
        .chain(
            (!undated.is_empty()).then(|| (None, INVALID_DATE_LABEL.to_string(), undated)),
        );

    groups
        .scan(initial_balance, |running, (month, label, events)| {
            let bucket = build_bucket(month, label, events, *running);
            *running = bucket.running_balance;
            Some(bucket)
        })
        .collect()
}

fn build_bucket(
    month: Option<MonthKey>,
    month_label: String,
    events: Vec<Event>,
    previous_balance: f64,
) -> MonthBucket {
    let (income, expense) = events
        .iter()
        .fold((0.0, 0.0), |(income, expense), e| match e.kind {
            EventKind::Income => (income + e.amount, expense),
            EventKind::Expense => (income, expense + e.amount),
        });
    let month_balance = income - expense;

    MonthBucket {
        month_label,
        month,
        events,
        income,
        expense,
        month_balance,
        running_balance: previous_balance + month_balance,
    }
}
