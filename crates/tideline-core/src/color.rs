//! Deterministic color resolution for timeline items.
//!
//! Precedence, highest first:
//!
//! 1. explicit per-record color override,
//! 2. configured palette override for the status/category,
//! 3. built-in table for the status/category,
//! 4. neutral fallback.
//!
//! Resolution never fails: an unrecognised status or category resolves to
//! the neutral fallback.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{EventCategory, TaskStatus};

/// Neutral fallback color used when no table entry applies.
pub const NEUTRAL_COLOR: &str = "#64748b";

const fn status_base_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "#3b82f6",
        TaskStatus::InProgress => "#f59e0b",
        TaskStatus::Done => "#22c55e",
        TaskStatus::Overdue => "#ef4444",
        TaskStatus::Cancelled => "#9ca3af",
        TaskStatus::Unknown => NEUTRAL_COLOR,
    }
}

const fn category_base_color(category: EventCategory) -> &'static str {
    match category {
        EventCategory::Meeting => "#6366f1",
        EventCategory::Deadline => "#dc2626",
        EventCategory::Reminder => "#eab308",
        EventCategory::Personal => "#14b8a6",
        EventCategory::Other => NEUTRAL_COLOR,
    }
}

/// Display palette, overridable per deployment from the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Fallback when no table entry applies.
    pub neutral: String,
    /// Overrides keyed by the wire status (`OVERDUE`, `DONE`, ...).
    pub statuses: BTreeMap<String, String>,
    /// Overrides keyed by the event category (`meeting`, `deadline`, ...).
    pub categories: BTreeMap<String, String>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            neutral: NEUTRAL_COLOR.to_string(),
            statuses: BTreeMap::new(),
            categories: BTreeMap::new(),
        }
    }
}

impl Palette {
    /// Color for a task status.
    #[must_use]
    pub fn status_color(&self, status: TaskStatus) -> String {
        if let Some(color) = self.statuses.get(status.as_str()) {
            return color.clone();
        }
        match status {
            TaskStatus::Unknown => self.neutral.clone(),
            known => status_base_color(known).to_string(),
        }
    }

    /// Color for an event category.
    #[must_use]
    pub fn category_color(&self, category: EventCategory) -> String {
        if let Some(color) = self.categories.get(category.as_str()) {
            return color.clone();
        }
        match category {
            EventCategory::Other => self.neutral.clone(),
            known => category_base_color(known).to_string(),
        }
    }

    /// Color for an event record: explicit override first, then category.
    #[must_use]
    pub fn event_color(&self, override_color: Option<&str>, category: EventCategory) -> String {
        override_color.map_or_else(|| self.category_color(category), ToString::to_string)
    }
}
