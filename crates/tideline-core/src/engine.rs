//! Engine facade: the one object the page controller talks to.
//!
//! Owns the unified store and the mutation controller behind a mutex (the
//! lock is never held across an await), and wires the backend, the
//! external provider, and the render surface together:
//!
//! - viewport change → query plan → concurrent event + task fetch →
//!   normalize → merge → `items_changed`,
//! - drag/resize → optimistic upsert → background reschedule → confirm or
//!   rollback,
//! - sync → provider pull → reconcile (store untouched on failure).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::backend::{
    BackendError, CalendarProvider, DashboardApi, NewEvent, ProviderError, RawTask, RescheduleAck,
};
use crate::config::EngineConfig;
use crate::model::{ItemId, ItemKind, TimelineItem};
use crate::mutation::{MutationController, MutationError, Outcome, Resolution};
use crate::normalize::{normalize_event, normalize_task};
use crate::planner::{QueryPlan, TaskPageQuery};
use crate::range::{DateRange, InvalidInterval};
use crate::store::TimelineStore;
use crate::sync::{SyncReport, reconcile};
use crate::surface::RenderSurface;

/// Failure of an engine operation that talks to the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// What one refresh did to the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefreshReport {
    /// Ids whose stored value changed.
    pub changed: Vec<ItemId>,
    /// Task ids dropped because the latest snapshot no longer yields them
    /// (deadline cleared, or the task is gone).
    pub removed: Vec<ItemId>,
    /// Raw events the backend returned.
    pub events_fetched: usize,
    /// Raw tasks the backend returned across all pages.
    pub tasks_fetched: usize,
}

struct EngineState {
    store: TimelineStore,
    controller: MutationController,
}

/// Unified event aggregation and optimistic rescheduling engine.
pub struct Engine {
    state: Mutex<EngineState>,
    api: Arc<dyn DashboardApi>,
    provider: Arc<dyn CalendarProvider>,
    surface: Arc<dyn RenderSurface>,
    config: EngineConfig,
}

impl Engine {
    /// Engine over the given seams, with an empty store.
    #[must_use]
    pub fn new(
        api: Arc<dyn DashboardApi>,
        provider: Arc<dyn CalendarProvider>,
        surface: Arc<dyn RenderSurface>,
        config: EngineConfig,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState {
                store: TimelineStore::new(),
                controller: MutationController::new(),
            }),
            api,
            provider,
            surface,
            config,
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop all cached items and pending mutations (page teardown, tests).
    pub fn reset(&self) {
        let mut state = self.state();
        state.store.reset();
        state.controller.reset();
    }

    /// Items intersecting `range`, in render order.
    #[must_use]
    pub fn visible_items(&self, range: &DateRange) -> Vec<TimelineItem> {
        self.state()
            .store
            .query(range)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Read-only detail lookup for a clicked item. Not a mutation.
    #[must_use]
    pub fn item_detail(&self, id: &ItemId) -> Option<TimelineItem> {
        self.state().store.get(id).cloned()
    }

    /// Populate the store for a viewport. Call on every viewport change;
    /// the merge is idempotent, so overlapping viewports are cheap.
    ///
    /// # Errors
    ///
    /// Returns the first [`BackendError`] from either fetch; the store is
    /// left as it was.
    pub async fn refresh(&self, viewport: DateRange) -> Result<RefreshReport, BackendError> {
        let plan = QueryPlan::for_viewport(viewport, &self.config.fetch);
        let (raw_events, task_walk) = futures::try_join!(
            self.api.events_in_range(plan.events.range),
            self.fetch_all_tasks(plan.tasks),
        )?;
        let (raw_tasks, tasks_complete) = task_walk;

        let mut incoming = Vec::with_capacity(raw_events.len() + raw_tasks.len());
        for raw in &raw_events {
            incoming.push(normalize_event(raw, &self.config.palette));
        }
        let mut live_task_ids = Vec::new();
        for raw in &raw_tasks {
            if let Some(item) = normalize_task(raw, &self.config.palette) {
                live_task_ids.push(item.id.clone());
                incoming.push(item);
            }
        }

        let mut report = RefreshReport {
            events_fetched: raw_events.len(),
            tasks_fetched: raw_tasks.len(),
            ..RefreshReport::default()
        };

        {
            let mut state = self.state();
            // A fetch racing an in-flight drag must not clobber the
            // optimistic value; the mutation outcome settles those items.
            incoming.retain(|item| !state.controller.is_pending(&item.id));
            report.changed = state.store.merge(incoming);

            // The task walk is a full snapshot: a known task it no longer
            // yields lost its deadline or was deleted. A capped
            // (incomplete) walk proves nothing, so it prunes nothing.
            if tasks_complete {
                for id in state.store.ids_of_kind(ItemKind::Task) {
                    if !live_task_ids.contains(&id) {
                        state.store.remove(&id);
                        report.removed.push(id);
                    }
                }
            }
        }

        info!(
            events = report.events_fetched,
            tasks = report.tasks_fetched,
            changed = report.changed.len(),
            removed = report.removed.len(),
            "viewport refresh complete"
        );

        let mut affected = report.changed.clone();
        affected.extend(report.removed.iter().cloned());
        if !affected.is_empty() {
            self.surface.items_changed(&affected);
        }
        Ok(report)
    }

    /// Walk the unfiltered task listing page by page.
    async fn fetch_all_tasks(
        &self,
        plan: TaskPageQuery,
    ) -> Result<(Vec<RawTask>, bool), BackendError> {
        let page_size = plan.page_size.max(1);
        let mut all = Vec::new();
        let mut page = 0;
        loop {
            let batch = self.api.tasks_page(page, page_size).await?;
            let last = batch.len() < page_size;
            all.extend(batch);
            if last {
                return Ok((all, true));
            }
            page += 1;
            if page >= plan.max_pages {
                warn!(pages = page, "task walk capped before exhausting the listing");
                return Ok((all, false));
            }
        }
    }

    /// Apply a drag/drop or resize from the calendar widget.
    ///
    /// The store reflects the new times before the network round-trip; on
    /// rejection it snaps back to the pre-drag value and the surface gets
    /// one rollback notice. A second drag on the same item supersedes the
    /// first — the slower response is discarded, whatever it says.
    ///
    /// # Errors
    ///
    /// [`MutationError`] when the mutation is rejected locally (inverted
    /// interval, unknown id, read-only item); nothing was sent. Server
    /// rejection is not an `Err` — it resolves to
    /// [`Resolution::RolledBack`].
    pub async fn drag_or_resize(
        &self,
        id: &ItemId,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
    ) -> Result<Resolution, MutationError> {
        let ticket = {
            let mut state = self.state();
            let EngineState { store, controller } = &mut *state;
            controller.begin(store, id, new_start, new_end)?
        };
        self.surface.items_changed(std::slice::from_ref(id));

        let response = self
            .api
            .reschedule_event(id.source(), new_start, new_end)
            .await;
        let outcome = match response {
            Ok(ack) => Outcome::Confirmed {
                canonical: canonical_from_ack(ack, new_start, new_end),
            },
            Err(err) => Outcome::Failed {
                reason: err.to_string(),
            },
        };

        let resolution = {
            let mut state = self.state();
            let EngineState { store, controller } = &mut *state;
            controller.resolve(store, &ticket, outcome)
        };

        match &resolution {
            Resolution::RolledBack { reason } => {
                self.surface.items_changed(std::slice::from_ref(id));
                self.surface.mutation_rolled_back(id, reason);
            }
            Resolution::Confirmed { changed: true } => {
                self.surface.items_changed(std::slice::from_ref(id));
            }
            Resolution::Confirmed { changed: false } | Resolution::Superseded => {}
        }
        Ok(resolution)
    }

    /// Create an event and add it to the store once the backend confirms.
    ///
    /// # Errors
    ///
    /// [`EngineError::Mutation`] for an inverted interval (nothing sent);
    /// [`EngineError::Backend`] when the create request fails.
    pub async fn create_event(&self, event: &NewEvent) -> Result<ItemId, EngineError> {
        if event.end < event.start {
            return Err(MutationError::InvalidInterval(InvalidInterval {
                start: event.start,
                end: event.end,
            })
            .into());
        }
        let raw = self.api.create_event(event).await?;
        let item = normalize_event(&raw, &self.config.palette);
        let id = item.id.clone();
        self.state().store.upsert(item);
        self.surface.items_changed(std::slice::from_ref(&id));
        Ok(id)
    }

    /// Delete an event once the backend confirms.
    ///
    /// # Errors
    ///
    /// [`EngineError::Mutation`] for unknown or read-only items (task
    /// deadlines and provider imports are not deletable from the
    /// calendar); [`EngineError::Backend`] when the delete request fails —
    /// the item stays.
    pub async fn delete_event(&self, id: &ItemId) -> Result<(), EngineError> {
        {
            let state = self.state();
            let item = state
                .store
                .get(id)
                .ok_or_else(|| MutationError::UnknownItem(id.clone()))?;
            if !item.mutable {
                return Err(MutationError::ReadOnly(id.clone()).into());
            }
        }

        self.api.delete_event(id.source()).await?;

        let removed = {
            let mut state = self.state();
            state.controller.cancel(id);
            state.store.remove(id)
        };
        if removed.is_some() {
            self.surface.items_changed(std::slice::from_ref(id));
        }
        Ok(())
    }

    /// Pull the provider snapshot for `range` and reconcile it.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotConfigured`] when no provider is set up (the
    /// provider is not called), or the provider's own failure. Either way
    /// the store is untouched and the surface gets one distinct,
    /// dismissible notice.
    pub async fn sync_external(&self, range: DateRange) -> Result<SyncReport, ProviderError> {
        if !self.config.sync.enabled {
            let failure = ProviderError::NotConfigured;
            self.surface.sync_unavailable(&failure);
            return Err(failure);
        }

        match self.provider.pull(range).await {
            Ok(pulled) => {
                let report = {
                    let mut state = self.state();
                    reconcile(&mut state.store, &range, &pulled, &self.config.palette)
                };
                let affected = report.affected_ids();
                if !affected.is_empty() {
                    self.surface.items_changed(&affected);
                }
                Ok(report)
            }
            Err(failure) => {
                warn!(%failure, "provider sync failed; store untouched");
                self.surface.sync_unavailable(&failure);
                Err(failure)
            }
        }
    }
}

/// Canonical times from an acknowledgement, when the server adjusted
/// either bound.
fn canonical_from_ack(
    ack: RescheduleAck,
    requested_start: DateTime<Utc>,
    requested_end: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    if ack.start.is_none() && ack.end.is_none() {
        return None;
    }
    Some((
        ack.start.unwrap_or(requested_start),
        ack.end.unwrap_or(requested_end),
    ))
}
