//! Canonical timeline item model.
//!
//! A [`TimelineItem`] is the one shape the render surface ever sees,
//! regardless of whether the underlying record is a calendar event or a
//! deadline-bearing task. Items are values: they are replaced on change,
//! never mutated in place.
//!
//! # Invariants
//!
//! - `start <= end` for every constructed item.
//! - `external_ref` is present exactly when `origin` is [`Origin::External`].
//! - Task-derived items are never `mutable`; their canonical edit path is
//!   the task record, not the calendar.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::item_id::ItemId;
use crate::range::InvalidInterval;

/// The two source kinds unified onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Event,
    Task,
}

impl ItemKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an item was authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Created in this system.
    Local,
    /// Imported from the third-party calendar provider.
    External,
}

/// Dashboard task lifecycle status.
///
/// The five known statuses each map to a fixed display color. Anything else
/// the backend sends lands in [`TaskStatus::Unknown`] — an unrecognised
/// status must never fail normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Overdue,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Overdue => "OVERDUE",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event subtype used for category-based color resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Meeting,
    Deadline,
    Reminder,
    Personal,
    #[serde(other)]
    Other,
}

impl Default for EventCategory {
    fn default() -> Self {
        Self::Other
    }
}

impl EventCategory {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Deadline => "deadline",
            Self::Reminder => "reminder",
            Self::Personal => "personal",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific metadata carried through to the render surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDetails {
    pub category: EventCategory,
    pub description: String,
    pub location: String,
    pub reminder: Option<DateTime<Utc>>,
    /// Fields the engine does not interpret, passed through untouched.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Task-specific metadata carried through to the render surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDetails {
    pub status: TaskStatus,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    /// Fields the engine does not interpret, passed through untouched.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Kind-specific payload, opaque to the engine beyond the tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemPayload {
    Event(EventDetails),
    Task(TaskDetails),
}

impl ItemPayload {
    /// Task status, when this is a task payload.
    #[must_use]
    pub const fn task_status(&self) -> Option<TaskStatus> {
        match self {
            Self::Task(details) => Some(details.status),
            Self::Event(_) => None,
        }
    }
}

/// Canonical unit rendered on the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    /// Resolved display color. Derived, never authoritative; recomputed on
    /// every normalization pass.
    pub color: String,
    pub origin: Origin,
    pub external_ref: Option<String>,
    /// Whether drag/resize rescheduling is accepted for this item.
    pub mutable: bool,
    pub payload: ItemPayload,
}

impl TimelineItem {
    /// Copy of this item with a new `[start, end)` span.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInterval`] when `end < start`; the original item is
    /// untouched.
    pub fn with_times(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, InvalidInterval> {
        if end < start {
            return Err(InvalidInterval { start, end });
        }
        let mut updated = self.clone();
        updated.start = start;
        updated.end = end;
        Ok(updated)
    }
}
