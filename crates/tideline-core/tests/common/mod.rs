//! Scripted collaborators shared by the integration suites.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures::channel::oneshot;

use tideline_core::backend::{
    BackendError, CalendarProvider, DashboardApi, NewEvent, ProviderError, RawEvent,
    RawProviderEvent, RawTask, RescheduleAck,
};
use tideline_core::model::{EventCategory, ItemId, TaskStatus};
use tideline_core::range::DateRange;
use tideline_core::surface::RenderSurface;

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0)
        .single()
        .expect("valid test date")
}

pub fn june(from_day: u32, to_day: u32) -> DateRange {
    DateRange::new(at(from_day, 0), at(to_day, 0)).expect("range")
}

pub fn raw_event(id: u64, day: u32) -> RawEvent {
    RawEvent {
        id,
        title: Some(format!("event {id}")),
        start: at(day, 0),
        end: Some(at(day, 0)),
        all_day: false,
        category: EventCategory::Other,
        color: None,
        description: None,
        location: None,
        reminder: None,
        sync_ref: None,
        extra: BTreeMap::new(),
    }
}

pub fn raw_task(id: u64, deadline_day: Option<u32>, status: TaskStatus) -> RawTask {
    RawTask {
        id,
        title: Some(format!("task {id}")),
        deadline: deadline_day.map(|day| at(day, 0)),
        status,
        priority: None,
        assignee: None,
        extra: BTreeMap::new(),
    }
}

pub fn provider_event(external_ref: &str, day: u32) -> RawProviderEvent {
    RawProviderEvent {
        id: Some(format!("native-{external_ref}")),
        external_ref: Some(external_ref.to_string()),
        title: Some(format!("imported {external_ref}")),
        start: at(day, 10),
        end: Some(at(day, 11)),
        all_day: false,
        extra: BTreeMap::new(),
    }
}

/// Scripted dashboard backend.
#[derive(Default)]
pub struct MockApi {
    pub events: Mutex<Vec<RawEvent>>,
    pub tasks: Mutex<Vec<RawTask>>,
    /// Scripted reschedule responses, consumed in call order. An empty
    /// queue acknowledges with no canonical adjustment.
    pub reschedule_results: Mutex<VecDeque<Result<RescheduleAck, BackendError>>>,
    /// Gates awaited (in call order) before a reschedule responds, letting
    /// tests hold a response open while another call overtakes it.
    pub reschedule_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    pub reschedule_calls: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
    pub deleted: Mutex<Vec<String>>,
    next_event_id: AtomicU64,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            next_event_id: AtomicU64::new(1000),
            ..Self::default()
        }
    }

    pub fn with_events(self, events: Vec<RawEvent>) -> Self {
        *self.events.lock().expect("events lock") = events;
        self
    }

    pub fn with_tasks(self, tasks: Vec<RawTask>) -> Self {
        *self.tasks.lock().expect("tasks lock") = tasks;
        self
    }

    pub fn script_reschedule(&self, result: Result<RescheduleAck, BackendError>) {
        self.reschedule_results
            .lock()
            .expect("results lock")
            .push_back(result);
    }

    /// Register a gate for the next un-gated reschedule call; the call
    /// does not respond until the returned sender fires.
    pub fn gate_next_reschedule(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.reschedule_gates
            .lock()
            .expect("gates lock")
            .push_back(rx);
        tx
    }
}

#[async_trait]
impl DashboardApi for MockApi {
    async fn events_in_range(&self, range: DateRange) -> Result<Vec<RawEvent>, BackendError> {
        Ok(self
            .events
            .lock()
            .expect("events lock")
            .iter()
            .filter(|raw| {
                let end = raw.end.unwrap_or(raw.start);
                range.intersects_span(raw.start, end)
            })
            .cloned()
            .collect())
    }

    async fn tasks_page(&self, page: u32, page_size: usize) -> Result<Vec<RawTask>, BackendError> {
        let tasks = self.tasks.lock().expect("tasks lock");
        let from = (page as usize).saturating_mul(page_size);
        let to = from.saturating_add(page_size).min(tasks.len());
        Ok(tasks.get(from..to).unwrap_or(&[]).to_vec())
    }

    async fn create_event(&self, event: &NewEvent) -> Result<RawEvent, BackendError> {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        Ok(RawEvent {
            id,
            title: Some(event.title.clone()),
            start: event.start,
            end: Some(event.end),
            all_day: event.all_day,
            category: event.category,
            color: event.color.clone(),
            description: event.description.clone(),
            location: event.location.clone(),
            reminder: event.reminder,
            sync_ref: None,
            extra: BTreeMap::new(),
        })
    }

    async fn reschedule_event(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RescheduleAck, BackendError> {
        self.reschedule_calls
            .lock()
            .expect("calls lock")
            .push((id.to_string(), start, end));
        // Results and gates pair with calls in call order, so a held-open
        // response keeps the result it was scripted with.
        let result = self
            .reschedule_results
            .lock()
            .expect("results lock")
            .pop_front()
            .unwrap_or(Ok(RescheduleAck::default()));
        let gate = self.reschedule_gates.lock().expect("gates lock").pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        result
    }

    async fn delete_event(&self, id: &str) -> Result<(), BackendError> {
        self.deleted.lock().expect("deleted lock").push(id.to_string());
        Ok(())
    }
}

/// Scripted external provider.
#[derive(Default)]
pub struct MockProvider {
    pub pulls: Mutex<VecDeque<Result<Vec<RawProviderEvent>, ProviderError>>>,
}

impl MockProvider {
    pub fn script_pull(&self, result: Result<Vec<RawProviderEvent>, ProviderError>) {
        self.pulls.lock().expect("pulls lock").push_back(result);
    }
}

#[async_trait]
impl CalendarProvider for MockProvider {
    async fn pull(&self, _range: DateRange) -> Result<Vec<RawProviderEvent>, ProviderError> {
        self.pulls
            .lock()
            .expect("pulls lock")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Surface that records every notification.
#[derive(Default)]
pub struct RecordingSurface {
    pub changed: Mutex<Vec<Vec<ItemId>>>,
    pub rollbacks: Mutex<Vec<(ItemId, String)>>,
    pub sync_failures: Mutex<Vec<ProviderError>>,
}

impl RecordingSurface {
    pub fn rollback_count(&self) -> usize {
        self.rollbacks.lock().expect("rollbacks lock").len()
    }

    pub fn changed_batches(&self) -> Vec<Vec<ItemId>> {
        self.changed.lock().expect("changed lock").clone()
    }

    pub fn sync_failure_count(&self) -> usize {
        self.sync_failures.lock().expect("failures lock").len()
    }
}

impl RenderSurface for RecordingSurface {
    fn items_changed(&self, ids: &[ItemId]) {
        self.changed.lock().expect("changed lock").push(ids.to_vec());
    }

    fn mutation_rolled_back(&self, id: &ItemId, reason: &str) {
        self.rollbacks
            .lock()
            .expect("rollbacks lock")
            .push((id.clone(), reason.to_string()));
    }

    fn sync_unavailable(&self, failure: &ProviderError) {
        self.sync_failures
            .lock()
            .expect("failures lock")
            .push(failure.clone());
    }
}
