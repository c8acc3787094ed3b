//! External interfaces the engine consumes.
//!
//! Two seams: the dashboard's own REST backend ([`DashboardApi`]) and the
//! third-party calendar provider ([`CalendarProvider`]). Both are async
//! traits so the engine stays runtime-agnostic; the page controllers (or a
//! test harness) supply the implementations.
//!
//! Provider failures are deliberately their own error type: "no provider
//! configured" is a dismissible notice, not a request failure, and must
//! never be conflated with a rejected mutation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{EventCategory, TaskStatus};
use crate::range::DateRange;

// ---------------------------------------------------------------------------
// Raw wire records
// ---------------------------------------------------------------------------

/// Event record as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    /// Missing end means an instantaneous event.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub category: EventCategory,
    /// Explicit display color override.
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reminder: Option<DateTime<Utc>>,
    /// Provider sync reference, present when this record mirrors an
    /// external provider entry.
    #[serde(default)]
    pub sync_ref: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Task record as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    /// Tasks without a deadline never reach the timeline.
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Event record as the external provider returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProviderEvent {
    /// Provider-native id. Not stable across re-imports in all providers;
    /// never used as a dedup key.
    #[serde(default)]
    pub id: Option<String>,
    /// Stable reference used for deduplication across imports.
    #[serde(default)]
    pub external_ref: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Fields for creating an event through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub category: EventCategory,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub reminder: Option<DateTime<Utc>>,
}

/// Reschedule acknowledgement. The server may adjust the requested times
/// (snapping, working-hours policy); when it does, the canonical times come
/// back here and replace the optimistic ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RescheduleAck {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure talking to the dashboard backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The request never completed (network failure or timeout).
    #[error("request failed: {0}")]
    Request(String),
    /// The request completed but the server answered `success: false`.
    #[error("server rejected the request: {0}")]
    Rejected(String),
}

/// Failure pulling from the external calendar provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No provider is connected for this account.
    #[error("no external calendar provider is configured")]
    NotConfigured,
    /// The provider is connected but the pull failed.
    #[error("calendar provider unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The dashboard's own REST backend.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Event records intersecting `range`.
    async fn events_in_range(&self, range: DateRange) -> Result<Vec<RawEvent>, BackendError>;

    /// One page of the unfiltered task listing. Pages are zero-based; a
    /// page shorter than `page_size` is the last one.
    async fn tasks_page(&self, page: u32, page_size: usize) -> Result<Vec<RawTask>, BackendError>;

    /// Create an event; the created record (with its assigned id) comes back.
    async fn create_event(&self, event: &NewEvent) -> Result<RawEvent, BackendError>;

    /// Move/resize an event record.
    async fn reschedule_event(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RescheduleAck, BackendError>;

    /// Delete an event record.
    async fn delete_event(&self, id: &str) -> Result<(), BackendError>;
}

/// The third-party calendar provider, already authenticated.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Snapshot of provider entries intersecting `range`.
    async fn pull(&self, range: DateRange) -> Result<Vec<RawProviderEvent>, ProviderError>;
}

/// Provider handle for deployments with no external calendar connected.
/// Every pull reports [`ProviderError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredProvider;

#[async_trait]
impl CalendarProvider for UnconfiguredProvider {
    async fn pull(&self, _range: DateRange) -> Result<Vec<RawProviderEvent>, ProviderError> {
        Err(ProviderError::NotConfigured)
    }
}
