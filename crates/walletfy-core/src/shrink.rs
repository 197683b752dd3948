//! Budget-constrained payload shrinking
//!
//! The summary payload handed to the assistant must stay under a size budget
//! measured in approximate tokens. Reductions are applied in a fixed order,
//! each one only while the payload is still over budget:
//!
//! 1. Drop the flattened list of every event (`full` → `reduced`)
//! 2. Cap both top-event lists at 5 entries
//! 3. Keep only the 12 most recent months (`reduced` → `window-reduced`)
//!
//! Stages are irreversible and the ladder never fails: if the payload is still
//! too large after the last stage it is returned as-is with its real size.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::summary::SummaryPayload;

/// Top-event cap applied by [`ShrinkStage::TruncateTopEvents`]
pub const REDUCED_TOP_EVENTS: usize = 5;

/// Months kept by [`ShrinkStage::RecentMonthsWindow`]
pub const RECENT_MONTHS_WINDOW: usize = 12;

/// Approximates how much of a model's context a piece of text occupies
pub trait SizeEstimator {
    fn estimate(&self, text: &str) -> usize;
}

/// Characters divided by a fixed ratio, rounded up
///
/// Four characters per token is the usual rule of thumb for English and JSON.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    chars_per_unit: usize,
}

impl CharRatioEstimator {
    pub fn new(chars_per_unit: usize) -> Self {
        Self {
            chars_per_unit: chars_per_unit.max(1),
        }
    }
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}

impl SizeEstimator for CharRatioEstimator {
    fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_unit)
    }
}

/// How much of the payload had to be given up to fit the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegradationMode {
    Full,
    Reduced,
    WindowReduced,
}

impl DegradationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Reduced => "reduced",
            Self::WindowReduced => "window-reduced",
        }
    }

    /// Mode after applying `stage`; modes only move forward
    pub fn transition(self, stage: ShrinkStage) -> Self {
        self.max(stage.resulting_mode())
    }
}

impl std::fmt::Display for DegradationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One step of the reduction ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShrinkStage {
    DropEventList,
    TruncateTopEvents,
    RecentMonthsWindow,
}

impl ShrinkStage {
    /// Stages in the order they are applied
    pub fn all() -> &'static [ShrinkStage] {
        &[
            Self::DropEventList,
            Self::TruncateTopEvents,
            Self::RecentMonthsWindow,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropEventList => "drop_event_list",
            Self::TruncateTopEvents => "truncate_top_events",
            Self::RecentMonthsWindow => "recent_months_window",
        }
    }

    fn resulting_mode(&self) -> DegradationMode {
        match self {
            Self::DropEventList | Self::TruncateTopEvents => DegradationMode::Reduced,
            Self::RecentMonthsWindow => DegradationMode::WindowReduced,
        }
    }

    /// Apply this reduction to the payload in place
    pub fn apply(&self, payload: &mut SummaryPayload) {
        match self {
            Self::DropEventList => {
                payload.all_events = None;
            }
            Self::TruncateTopEvents => {
                payload.top_events.expenses.truncate(REDUCED_TOP_EVENTS);
                payload.top_events.incomes.truncate(REDUCED_TOP_EVENTS);
            }
            Self::RecentMonthsWindow => {
                let months = std::mem::take(&mut payload.months);
                let skip = months.len().saturating_sub(RECENT_MONTHS_WINDOW);
                payload.months = months.into_iter().skip(skip).collect();
            }
        }
    }
}

/// Size measured after a stage (`stage` is None for the initial measurement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageMeasurement {
    pub stage: Option<ShrinkStage>,
    pub mode: DegradationMode,
    pub size_estimate: usize,
}

/// Result of fitting a payload to a budget
#[derive(Debug, Clone)]
pub struct FittedPayload {
    pub payload: SummaryPayload,
    /// Compact JSON of `payload`
    pub serialized: String,
    pub size_estimate: usize,
    pub mode: DegradationMode,
    /// Initial measurement followed by one entry per applied stage
    pub trace: Vec<StageMeasurement>,
}

impl FittedPayload {
    pub fn fits(&self, budget: usize) -> bool {
        self.size_estimate <= budget
    }
}

/// Applies the reduction ladder until a payload fits
#[derive(Debug, Clone, Default)]
pub struct BudgetShrinker<E = CharRatioEstimator> {
    estimator: E,
}

impl BudgetShrinker<CharRatioEstimator> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: SizeEstimator> BudgetShrinker<E> {
    pub fn with_estimator(estimator: E) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Size estimate of the payload's compact JSON
    pub fn measure(&self, payload: &SummaryPayload) -> Result<usize> {
        let serialized = serde_json::to_string(payload)?;
        Ok(self.estimator.estimate(&serialized))
    }

    /// Shrink `payload` stage by stage until it fits `budget`
    pub fn fit(&self, mut payload: SummaryPayload, budget: usize) -> Result<FittedPayload> {
        let mut serialized = serde_json::to_string(&payload)?;
        let mut size_estimate = self.estimator.estimate(&serialized);
        let mut mode = DegradationMode::Full;
        let mut trace = vec![StageMeasurement {
            stage: None,
            mode,
            size_estimate,
        }];

        for &stage in ShrinkStage::all() {
            if size_estimate <= budget {
                break;
            }

            stage.apply(&mut payload);
            mode = mode.transition(stage);
            serialized = serde_json::to_string(&payload)?;
            size_estimate = self.estimator.estimate(&serialized);
            trace.push(StageMeasurement {
                stage: Some(stage),
                mode,
                size_estimate,
            });

            debug!(
                stage = stage.as_str(),
                mode = mode.as_str(),
                size_estimate,
                budget,
                "Applied summary reduction"
            );
        }

        if size_estimate > budget {
            warn!(
                size_estimate,
                budget, "Summary still over budget after all reductions"
            );
        }

        Ok(FittedPayload {
            payload,
            serialized,
            size_estimate,
            mode,
            trace,
        })
    }
}
