//! External provider reconciliation.
//!
//! A sync pull hands the engine a snapshot of the provider's entries for a
//! window. Reconciliation merges that snapshot into the store keyed by the
//! stable external reference (never the provider-native id), then evicts
//! previously-imported entries whose reference vanished from the snapshot
//! — they were deleted upstream. Eviction is scoped to the queried window:
//! a narrow sync must never reach items outside it.
//!
//! The caller pulls from the provider first and only reconciles on
//! success, so a failed pull leaves the store byte-for-byte untouched.

use std::collections::BTreeSet;

use tracing::info;

use crate::backend::RawProviderEvent;
use crate::color::Palette;
use crate::model::ItemId;
use crate::normalize::normalize_provider_event;
use crate::range::DateRange;
use crate::store::TimelineStore;

/// What one reconciliation pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Ids whose stored value changed (imported or updated).
    pub changed: Vec<ItemId>,
    /// Ids evicted because their reference left the provider snapshot.
    pub removed: Vec<ItemId>,
    /// Provider entries skipped for lack of a stable reference.
    pub skipped: usize,
}

impl SyncReport {
    /// Every id the render surface should repaint.
    #[must_use]
    pub fn affected_ids(&self) -> Vec<ItemId> {
        let mut ids = self.changed.clone();
        ids.extend(self.removed.iter().cloned());
        ids
    }
}

/// Merge a provider snapshot for `range` into the store.
pub fn reconcile(
    store: &mut TimelineStore,
    range: &DateRange,
    pulled: &[RawProviderEvent],
    palette: &Palette,
) -> SyncReport {
    let mut report = SyncReport::default();
    let mut live_refs = BTreeSet::new();

    for raw in pulled {
        let Some(mut item) = normalize_provider_event(raw, palette) else {
            report.skipped += 1;
            continue;
        };

        if let Some(external_ref) = item.external_ref.clone() {
            live_refs.insert(external_ref.clone());
            // A ref already mirrored by a backend record keeps its id, so
            // re-imports update in place instead of swapping entries.
            if let Some(existing) = store.id_for_ref(&external_ref) {
                item.id = existing.clone();
                item.kind = existing.kind();
            }
        }

        let id = item.id.clone();
        if store.upsert(item) {
            report.changed.push(id);
        }
    }

    report.removed = store.retain_external_in_range(range, &live_refs);

    info!(
        imported = report.changed.len(),
        removed = report.removed.len(),
        skipped = report.skipped,
        "provider reconciliation complete"
    );
    report
}
