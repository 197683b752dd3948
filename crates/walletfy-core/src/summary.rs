//! Financial summary for the assistant
//!
//! Builds a compact, machine-readable snapshot of the user's finances:
//! totals, per-month statistics keyed by `YYYY-MM`, extremal months and
//! events, top events by amount, and (while the budget allows) every event in
//! flattened form. The payload is then fitted to a size budget by
//! [`BudgetShrinker`].
//!
//! Unlike the display grouping in [`crate::aggregate`], events with an
//! unparseable date are left out entirely, and every monetary value is rounded
//! to cents.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::dates::month_key;
use crate::error::Result;
use crate::models::{Event, EventKind};
use crate::money::round2;
use crate::shrink::{
    BudgetShrinker, CharRatioEstimator, DegradationMode, SizeEstimator, StageMeasurement,
};

/// Default size budget, in estimated tokens
pub const DEFAULT_SIZE_BUDGET: usize = 3400;

/// Entries kept in each top-event list before any reduction
pub const TOP_EVENTS_LIMIT: usize = 10;

/// Range shown when no month is present
pub const EMPTY_RANGE: &str = "—";

/// Terminology embedded in the payload so the model reads fields correctly
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Definitions {
    pub month_key: &'static str,
    pub income: &'static str,
    pub expense: &'static str,
    pub balance: &'static str,
    pub cumulative_balance: &'static str,
}

impl Default for Definitions {
    fn default() -> Self {
        Self {
            month_key: "YYYY-MM",
            income: "sum of amounts with kind = \"income\" in that month",
            expense: "sum of amounts with kind = \"expense\" in that month",
            balance: "income - expense for the month",
            cumulative_balance: "month balance + sum of balances of all previous months",
        }
    }
}

/// Aggregate figures over every included event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub months_with_data: usize,
}

/// Figures for one `YYYY-MM` month
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthStat {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    pub cumulative_balance: f64,
    pub event_count: usize,
}

/// An event reduced to what the model needs to cite it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDigest {
    pub month_key: String,
    pub name: String,
    pub amount: f64,
}

/// An event in the flattened full list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatEvent {
    pub month_key: String,
    pub name: String,
    pub amount: f64,
    pub kind: EventKind,
    pub date: String,
}

/// Extremal months and events
///
/// Month fields are None when there is no data; the matching value is 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlights {
    pub max_expense_month: Option<String>,
    pub max_expense: f64,
    pub max_income_month: Option<String>,
    pub max_income: f64,
    pub max_balance_month: Option<String>,
    pub max_balance: f64,
    pub min_balance_month: Option<String>,
    pub min_balance: f64,
    pub largest_expense: Option<EventDigest>,
    pub largest_income: Option<EventDigest>,
}

/// Largest events by amount, descending
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEvents {
    pub expenses: Vec<EventDigest>,
    pub incomes: Vec<EventDigest>,
}

/// The analytical snapshot serialized into the assistant's instructions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub definitions: Definitions,
    pub totals: Totals,
    /// Sorted by key, which is chronological for `YYYY-MM`
    pub months: BTreeMap<String, MonthStat>,
    pub highlights: Highlights,
    pub top_events: TopEvents,
    /// Present only in `full` mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_events: Option<Vec<FlatEvent>>,
}

impl SummaryPayload {
    /// `"first → last"` over the months present, or [`EMPTY_RANGE`]
    pub fn months_range(&self) -> String {
        match (self.months.keys().next(), self.months.keys().next_back()) {
            (Some(first), Some(last)) => format!("{} → {}", first, last),
            _ => EMPTY_RANGE.to_string(),
        }
    }
}

/// Facts about how the payload was produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub months_included: usize,
    pub total_events: usize,
    pub size_estimate: usize,
    pub mode: DegradationMode,
    pub months_range: String,
}

/// A fitted payload, its compact JSON, and stats
#[derive(Debug, Clone)]
pub struct FinancialSummary {
    pub payload: SummaryPayload,
    pub serialized: String,
    pub stats: SummaryStats,
    pub trace: Vec<StageMeasurement>,
}

/// Builds summaries and fits them to a budget
#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder<E = CharRatioEstimator> {
    shrinker: BudgetShrinker<E>,
}

impl SummaryBuilder<CharRatioEstimator> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: SizeEstimator> SummaryBuilder<E> {
    pub fn with_estimator(estimator: E) -> Self {
        Self {
            shrinker: BudgetShrinker::with_estimator(estimator),
        }
    }

    /// Build the full payload and shrink it to `size_budget`
    pub fn summarize(&self, events: &[Event], size_budget: usize) -> Result<FinancialSummary> {
        let ordered = dated_events(events);
        let payload = payload_from_ordered(&ordered);
        let fitted = self.shrinker.fit(payload, size_budget)?;

        let stats = SummaryStats {
            months_included: fitted.payload.months.len(),
            total_events: ordered.len(),
            size_estimate: fitted.size_estimate,
            mode: fitted.mode,
            months_range: fitted.payload.months_range(),
        };

        debug!(
            events = events.len(),
            included = stats.total_events,
            months = stats.months_included,
            size_estimate = stats.size_estimate,
            mode = stats.mode.as_str(),
            "Built financial summary"
        );

        Ok(FinancialSummary {
            payload: fitted.payload,
            serialized: fitted.serialized,
            stats,
            trace: fitted.trace,
        })
    }
}

/// Summarize with the default estimator
pub fn summarize(events: &[Event], size_budget: usize) -> Result<FinancialSummary> {
    SummaryBuilder::new().summarize(events, size_budget)
}

/// Build the unreduced (`full` mode) payload
pub fn build_payload(events: &[Event]) -> SummaryPayload {
    payload_from_ordered(&dated_events(events))
}

/// Events with a parseable date, stable-sorted by date
fn dated_events(events: &[Event]) -> Vec<(NaiveDate, &Event)> {
    let mut ordered: Vec<(NaiveDate, &Event)> = events
        .iter()
        .filter_map(|e| e.parsed_date().map(|d| (d, e)))
        .collect();
    ordered.sort_by_key(|(date, _)| *date);
    ordered
}

#[derive(Default)]
struct MonthSums {
    income: f64,
    expense: f64,
    count: usize,
}

fn payload_from_ordered(ordered: &[(NaiveDate, &Event)]) -> SummaryPayload {
    let mut sums: BTreeMap<String, MonthSums> = BTreeMap::new();
    let mut total_income = 0.0;
    let mut total_expense = 0.0;

    for (date, event) in ordered {
        let entry = sums.entry(month_key(*date)).or_default();
        match event.kind {
            EventKind::Income => {
                entry.income += event.amount;
                total_income += event.amount;
            }
            EventKind::Expense => {
                entry.expense += event.amount;
                total_expense += event.amount;
            }
        }
        entry.count += 1;
    }

    let months: BTreeMap<String, MonthStat> = sums
        .into_iter()
        .scan(0.0, |cumulative, (key, m)| {
            let income = round2(m.income);
            let expense = round2(m.expense);
            let balance = round2(income - expense);
            *cumulative += balance;
            Some((
                key,
                MonthStat {
                    income,
                    expense,
                    balance,
                    cumulative_balance: round2(*cumulative),
                    event_count: m.count,
                },
            ))
        })
        .collect();

    let total_income = round2(total_income);
    let total_expense = round2(total_expense);
    let totals = Totals {
        income: total_income,
        expense: total_expense,
        balance: round2(total_income - total_expense),
        months_with_data: months.len(),
    };

    let highlights = highlights(&months, ordered);
    let top_events = TopEvents {
        expenses: top_of_kind(ordered, EventKind::Expense, TOP_EVENTS_LIMIT),
        incomes: top_of_kind(ordered, EventKind::Income, TOP_EVENTS_LIMIT),
    };

    let all_events = ordered
        .iter()
        .map(|(date, e)| FlatEvent {
            month_key: month_key(*date),
            name: e.name.clone(),
            amount: round2(e.amount),
            kind: e.kind,
            date: e.date.clone(),
        })
        .collect();

    SummaryPayload {
        definitions: Definitions::default(),
        totals,
        months,
        highlights,
        top_events,
        all_events: Some(all_events),
    }
}

/// First month (ascending key order) whose value beats every earlier one
fn extreme_month<F, B>(
    months: &BTreeMap<String, MonthStat>,
    value: F,
    beats: B,
) -> (Option<String>, f64)
where
    F: Fn(&MonthStat) -> f64,
    B: Fn(f64, f64) -> bool,
{
    let best = months.iter().fold(None::<(&String, f64)>, |best, (key, stat)| {
        let v = value(stat);
        match best {
            Some((_, current)) if !beats(v, current) => best,
            _ => Some((key, v)),
        }
    });

    match best {
        Some((key, v)) => (Some(key.clone()), round2(v)),
        None => (None, 0.0),
    }
}

fn digest(date: NaiveDate, event: &Event) -> EventDigest {
    EventDigest {
        month_key: month_key(date),
        name: event.name.clone(),
        amount: round2(event.amount),
    }
}

/// Largest event of a kind; ties keep the earliest
fn largest_of_kind(ordered: &[(NaiveDate, &Event)], kind: EventKind) -> Option<EventDigest> {
    ordered
        .iter()
        .filter(|(_, e)| e.kind == kind)
        .fold(None::<&(NaiveDate, &Event)>, |best, candidate| match best {
            Some(b) if candidate.1.amount <= b.1.amount => Some(b),
            _ => Some(candidate),
        })
        .map(|(date, e)| digest(*date, e))
}

/// `limit` largest events of a kind, descending; ties keep date order
fn top_of_kind(ordered: &[(NaiveDate, &Event)], kind: EventKind, limit: usize) -> Vec<EventDigest> {
    let mut matching: Vec<&(NaiveDate, &Event)> =
        ordered.iter().filter(|(_, e)| e.kind == kind).collect();
    matching.sort_by(|a, b| b.1.amount.total_cmp(&a.1.amount));
    matching
        .into_iter()
        .take(limit)
        .map(|(date, e)| digest(*date, e))
        .collect()
}

fn highlights(months: &BTreeMap<String, MonthStat>, ordered: &[(NaiveDate, &Event)]) -> Highlights {
    let greater = |a: f64, b: f64| a > b;
    let lower = |a: f64, b: f64| a < b;

    let (max_expense_month, max_expense) = extreme_month(months, |m| m.expense, greater);
    let (max_income_month, max_income) = extreme_month(months, |m| m.income, greater);
    let (max_balance_month, max_balance) = extreme_month(months, |m| m.balance, greater);
    let (min_balance_month, min_balance) = extreme_month(months, |m| m.balance, lower);

    Highlights {
        max_expense_month,
        max_expense,
        max_income_month,
        max_income,
        max_balance_month,
        max_balance,
        min_balance_month,
        min_balance,
        largest_expense: largest_of_kind(ordered, EventKind::Expense),
        largest_income: largest_of_kind(ordered, EventKind::Income),
    }
}
