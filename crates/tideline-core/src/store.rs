//! Unified event store: the in-memory, range-queried cache of timeline
//! items.
//!
//! The store is a read cache plus the staging area for optimistic writes.
//! It holds no authority over persistence — the backend does — and it is
//! page-lifetime state, owned by the engine and reset between test cases
//! rather than living as an ambient global.
//!
//! # Invariants
//!
//! - Exactly one item per id. `merge` and `upsert` replace, never duplicate.
//! - An external reference resolves to exactly one item. Importing a ref
//!   that is already present replaces the existing entry.
//! - `merge` is idempotent: merging the same snapshot twice reports no
//!   changes the second time.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::model::{ItemId, ItemKind, Origin, TimelineItem};
use crate::range::DateRange;

/// In-memory index of timeline items.
#[derive(Debug, Default)]
pub struct TimelineStore {
    items: BTreeMap<ItemId, TimelineItem>,
    by_ref: HashMap<String, ItemId>,
}

impl TimelineStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every item and index entry.
    pub fn reset(&mut self) {
        self.items.clear();
        self.by_ref.clear();
    }

    /// Number of items held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up one item by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&TimelineItem> {
        self.items.get(id)
    }

    /// Id currently holding an external reference, if any.
    #[must_use]
    pub fn id_for_ref(&self, external_ref: &str) -> Option<&ItemId> {
        self.by_ref.get(external_ref)
    }

    /// Insert or replace a single item. Returns whether the stored value
    /// changed (inserting an identical item is a no-op).
    pub fn upsert(&mut self, item: TimelineItem) -> bool {
        if self.items.get(&item.id) == Some(&item) {
            return false;
        }

        // An external ref resolves to exactly one item: evict any other
        // holder of the incoming ref before indexing it.
        if let Some(external_ref) = item.external_ref.clone() {
            if let Some(holder) = self.by_ref.get(&external_ref).cloned() {
                if holder != item.id {
                    debug!(%external_ref, old = %holder, new = %item.id, "external ref moved");
                    self.items.remove(&holder);
                }
            }
            self.by_ref.insert(external_ref, item.id.clone());
        }

        if let Some(previous) = self.items.insert(item.id.clone(), item) {
            // The replaced value may have held a ref the new one dropped.
            if let Some(old_ref) = previous.external_ref {
                if self.by_ref.get(&old_ref) == Some(&previous.id) {
                    let still_held = self
                        .items
                        .get(&previous.id)
                        .is_some_and(|current| current.external_ref.as_deref() == Some(old_ref.as_str()));
                    if !still_held {
                        self.by_ref.remove(&old_ref);
                    }
                }
            }
        }
        true
    }

    /// Replace-by-id merge of a normalized snapshot. Returns the ids whose
    /// stored value actually changed; merging the same snapshot twice
    /// returns an empty list the second time.
    pub fn merge(&mut self, items: Vec<TimelineItem>) -> Vec<ItemId> {
        let mut changed = Vec::new();
        for item in items {
            let id = item.id.clone();
            if self.upsert(item) {
                changed.push(id);
            }
        }
        if !changed.is_empty() {
            debug!(changed = changed.len(), total = self.items.len(), "store merge");
        }
        changed
    }

    /// Remove one item.
    pub fn remove(&mut self, id: &ItemId) -> Option<TimelineItem> {
        let removed = self.items.remove(id)?;
        if let Some(external_ref) = &removed.external_ref {
            if self.by_ref.get(external_ref) == Some(id) {
                self.by_ref.remove(external_ref);
            }
        }
        Some(removed)
    }

    /// All items intersecting `range`, ordered for rendering: start
    /// ascending, events before tasks at equal start, id ascending as the
    /// final tie-break (so same-day reminders render above deadlines in
    /// list views, deterministically).
    #[must_use]
    pub fn query(&self, range: &DateRange) -> Vec<&TimelineItem> {
        let mut hits: Vec<&TimelineItem> = self
            .items
            .values()
            .filter(|item| range.intersects_span(item.start, item.end))
            .collect();
        hits.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| kind_rank(a.kind).cmp(&kind_rank(b.kind)))
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }

    /// Ids of all items of one kind.
    #[must_use]
    pub fn ids_of_kind(&self, kind: ItemKind) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|item| item.kind == kind)
            .map(|item| item.id.clone())
            .collect()
    }

    /// Remove external-origin items inside `range` whose reference is not
    /// in `live_refs` — they no longer exist upstream. Items outside the
    /// range are never touched, so a narrow sync window cannot evict
    /// entries beyond it. Returns the removed ids.
    pub fn retain_external_in_range(
        &mut self,
        range: &DateRange,
        live_refs: &BTreeSet<String>,
    ) -> Vec<ItemId> {
        let stale: Vec<ItemId> = self
            .items
            .values()
            .filter(|item| {
                item.origin == Origin::External
                    && range.intersects_span(item.start, item.end)
                    && item
                        .external_ref
                        .as_ref()
                        .is_some_and(|external_ref| !live_refs.contains(external_ref))
            })
            .map(|item| item.id.clone())
            .collect();

        for id in &stale {
            self.remove(id);
        }
        stale
    }
}

const fn kind_rank(kind: ItemKind) -> u8 {
    match kind {
        ItemKind::Event => 0,
        ItemKind::Task => 1,
    }
}
