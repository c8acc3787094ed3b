//! Optimistic mutation controller for drag/drop and resize rescheduling.
//!
//! Each mutation runs the state machine `PENDING_LOCAL → CONFIRMED |
//! ROLLED_BACK`. The store is updated before the network round-trip, so the
//! calendar reacts instantly; the pre-mutation snapshot is retained for
//! exactly the pending window and re-applied bit-identical on failure.
//!
//! Supersession is handled with per-item sequence numbers: a second drag on
//! an item while one is pending takes over the item's sequence, and a
//! response only applies when its ticket still carries the current
//! sequence. A superseded response — success or failure — is discarded
//! without touching the store, so a stale rollback can never clobber a
//! newer drag.
//!
//! # Invariants
//!
//! - At most one pending mutation per item id.
//! - A rejected interval (`end < start`) causes no state change and no
//!   request.
//! - Read-only items (task deadlines, provider imports) are rejected
//!   synchronously; their canonical edit path is elsewhere.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::model::{ItemId, TimelineItem};
use crate::range::InvalidInterval;
use crate::store::TimelineStore;

/// Why a mutation was rejected before any request was issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// The requested span ends before it starts.
    #[error(transparent)]
    InvalidInterval(#[from] InvalidInterval),
    /// No item with this id is in the store.
    #[error("unknown item {0}")]
    UnknownItem(ItemId),
    /// The item does not accept drag/resize; edit it at its source.
    #[error("item {0} is read-only on the timeline")]
    ReadOnly(ItemId),
}

/// Server response to a reschedule request, as the controller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The server accepted. `canonical` carries adjusted times when the
    /// server stored something other than what was asked for.
    Confirmed {
        canonical: Option<(DateTime<Utc>, DateTime<Utc>)>,
    },
    /// Network failure or server rejection.
    Failed { reason: String },
}

/// What applying a response did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The optimistic value stands (or was nudged to the server's
    /// canonical times, in which case `changed` is true).
    Confirmed { changed: bool },
    /// The pre-mutation snapshot was restored; the surface should re-render
    /// the item and show one failure notice.
    RolledBack { reason: String },
    /// A newer mutation took over this item; this response was discarded.
    /// Silent by design.
    Superseded,
}

/// Handle identifying one in-flight mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTicket {
    id: ItemId,
    seq: u64,
}

impl MutationTicket {
    /// Item this ticket belongs to.
    #[must_use]
    pub const fn id(&self) -> &ItemId {
        &self.id
    }

    /// Sequence number this ticket was issued under.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone)]
struct Pending {
    seq: u64,
    snapshot: TimelineItem,
}

/// Controller tracking every in-flight optimistic mutation.
#[derive(Debug, Default)]
pub struct MutationController {
    pending: HashMap<ItemId, Pending>,
    next_seq: u64,
}

impl MutationController {
    /// Controller with no pending mutations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of in-flight mutations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether an item has an in-flight mutation.
    #[must_use]
    pub fn is_pending(&self, id: &ItemId) -> bool {
        self.pending.contains_key(id)
    }

    /// Forget all pending state (pairs with [`TimelineStore::reset`]).
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Apply a move/resize optimistically and stage the rollback snapshot.
    ///
    /// On success the store already holds the new times when this returns;
    /// the caller issues the reschedule request and later feeds the
    /// response to [`resolve`](Self::resolve) with the returned ticket.
    ///
    /// Beginning a mutation on an item with one already pending supersedes
    /// the older one: its eventual response will be discarded, and the new
    /// snapshot is the item's current (optimistic) value rather than the
    /// original — rolling back the newer drag must not time-travel past it.
    ///
    /// # Errors
    ///
    /// - [`MutationError::InvalidInterval`] when `new_end < new_start`;
    ///   nothing changes and no request should be sent.
    /// - [`MutationError::UnknownItem`] when the id is not in the store.
    /// - [`MutationError::ReadOnly`] for items that do not accept
    ///   drag/resize; the caller should route the user to the item's own
    ///   edit path.
    pub fn begin(
        &mut self,
        store: &mut TimelineStore,
        id: &ItemId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<MutationTicket, MutationError> {
        if new_end < new_start {
            return Err(MutationError::InvalidInterval(InvalidInterval {
                start: new_start,
                end: new_end,
            }));
        }

        let current = store
            .get(id)
            .ok_or_else(|| MutationError::UnknownItem(id.clone()))?;
        if !current.mutable {
            return Err(MutationError::ReadOnly(id.clone()));
        }

        let snapshot = current.clone();
        let updated = snapshot.with_times(new_start, new_end)?;

        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some(previous) = self.pending.insert(id.clone(), Pending { seq, snapshot }) {
            debug!(item = %id, old_seq = previous.seq, new_seq = seq, "mutation superseded");
        }

        store.upsert(updated);
        Ok(MutationTicket {
            id: id.clone(),
            seq,
        })
    }

    /// Feed a response back. Stale tickets (superseded, or already
    /// resolved) are discarded without touching the store.
    pub fn resolve(
        &mut self,
        store: &mut TimelineStore,
        ticket: &MutationTicket,
        outcome: Outcome,
    ) -> Resolution {
        let current_seq = self.pending.get(&ticket.id).map(|pending| pending.seq);
        if current_seq != Some(ticket.seq) {
            debug!(item = %ticket.id, seq = ticket.seq, "stale mutation response discarded");
            return Resolution::Superseded;
        }

        let Some(pending) = self.pending.remove(&ticket.id) else {
            return Resolution::Superseded;
        };

        match outcome {
            Outcome::Confirmed { canonical } => {
                let changed = match canonical {
                    Some((start, end)) => apply_canonical(store, &ticket.id, start, end),
                    None => false,
                };
                Resolution::Confirmed { changed }
            }
            Outcome::Failed { reason } => {
                warn!(item = %ticket.id, %reason, "reschedule failed; rolling back");
                if store.get(&ticket.id).is_some() {
                    store.upsert(pending.snapshot);
                } else {
                    // The item was deleted while the request was in flight;
                    // rollback must not resurrect it.
                    debug!(item = %ticket.id, "rollback target gone; skipping");
                }
                Resolution::RolledBack { reason }
            }
        }
    }

    /// Drop any pending mutation for an item (used when the item itself is
    /// deleted mid-flight). Its eventual response resolves as superseded.
    pub fn cancel(&mut self, id: &ItemId) {
        if self.pending.remove(id).is_some() {
            debug!(item = %id, "pending mutation cancelled");
        }
    }
}

/// Replace the stored times with the server's canonical ones when they
/// differ from the optimistic value. Returns whether anything changed.
fn apply_canonical(
    store: &mut TimelineStore,
    id: &ItemId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    let Some(current) = store.get(id) else {
        return false;
    };
    if current.start == start && current.end == end {
        return false;
    }
    match current.with_times(start, end) {
        Ok(adjusted) => store.upsert(adjusted),
        Err(err) => {
            // A server echoing an inverted span must not poison the store.
            warn!(item = %id, %err, "ignoring invalid canonical times from server");
            false
        }
    }
}
