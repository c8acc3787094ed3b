//! Wire record → [`TimelineItem`] normalization.
//!
//! Normalization is total for the record shapes the backend can produce:
//! missing optional fields default (title and description become empty
//! strings, never nulls), unknown statuses and categories resolve to the
//! neutral color, and a backend record with an inverted span is clamped to
//! an instantaneous one rather than rejected. The only records that yield
//! no item are tasks without a deadline and provider entries without a
//! stable reference.

use tracing::warn;

use crate::backend::{RawEvent, RawProviderEvent, RawTask};
use crate::color::Palette;
use crate::model::{
    EventCategory, EventDetails, ItemId, ItemKind, ItemPayload, Origin, TaskDetails, TimelineItem,
};

/// Normalize a backend event record.
#[must_use]
pub fn normalize_event(raw: &RawEvent, palette: &Palette) -> TimelineItem {
    let start = raw.start;
    let mut end = raw.end.unwrap_or(start);
    if end < start {
        warn!(event = raw.id, %start, %end, "event span inverted; clamping to start");
        end = start;
    }

    let origin = if raw.sync_ref.is_some() {
        Origin::External
    } else {
        Origin::Local
    };

    TimelineItem {
        id: ItemId::event(raw.id.to_string()),
        kind: ItemKind::Event,
        title: raw.title.clone().unwrap_or_default(),
        start,
        end,
        all_day: raw.all_day,
        color: palette.event_color(raw.color.as_deref(), raw.category),
        origin,
        external_ref: raw.sync_ref.clone(),
        mutable: true,
        payload: ItemPayload::Event(EventDetails {
            category: raw.category,
            description: raw.description.clone().unwrap_or_default(),
            location: raw.location.clone().unwrap_or_default(),
            reminder: raw.reminder,
            extra: raw.extra.clone(),
        }),
    }
}

/// Normalize a backend task record onto the timeline.
///
/// Tasks surface as instantaneous all-day entries pinned to their deadline;
/// a task without a deadline has no timeline presence and yields `None`.
/// Task entries are read-only here — their canonical edit path is the task
/// record itself.
#[must_use]
pub fn normalize_task(raw: &RawTask, palette: &Palette) -> Option<TimelineItem> {
    let deadline = raw.deadline?;

    Some(TimelineItem {
        id: ItemId::task(raw.id.to_string()),
        kind: ItemKind::Task,
        title: raw.title.clone().unwrap_or_default(),
        start: deadline,
        end: deadline,
        all_day: true,
        color: palette.status_color(raw.status),
        origin: Origin::Local,
        external_ref: None,
        mutable: false,
        payload: ItemPayload::Task(TaskDetails {
            status: raw.status,
            priority: raw.priority.clone(),
            assignee: raw.assignee.clone(),
            extra: raw.extra.clone(),
        }),
    })
}

/// Normalize an external provider entry.
///
/// Entries without a stable reference cannot be deduplicated across
/// re-imports and are skipped. Provider entries are read-only on the
/// timeline: there is no backend record to reschedule, and writing back to
/// the provider is the provider UI's job.
#[must_use]
pub fn normalize_provider_event(raw: &RawProviderEvent, palette: &Palette) -> Option<TimelineItem> {
    let Some(external_ref) = raw.external_ref.clone() else {
        warn!(provider_id = ?raw.id, "provider entry without stable reference; skipping");
        return None;
    };

    let start = raw.start;
    let mut end = raw.end.unwrap_or(start);
    if end < start {
        warn!(%external_ref, %start, %end, "provider span inverted; clamping to start");
        end = start;
    }

    Some(TimelineItem {
        id: ItemId::external(&external_ref),
        kind: ItemKind::Event,
        title: raw.title.clone().unwrap_or_default(),
        start,
        end,
        all_day: raw.all_day,
        color: palette.event_color(None, EventCategory::Other),
        origin: Origin::External,
        external_ref: Some(external_ref),
        mutable: false,
        payload: ItemPayload::Event(EventDetails {
            extra: raw.extra.clone(),
            ..EventDetails::default()
        }),
    })
}
