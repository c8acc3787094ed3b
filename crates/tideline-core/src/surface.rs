//! Seam between the engine and the calendar widget.
//!
//! The engine never renders; it tells the surface which items to repaint
//! and which transient notices to show. Notices are split by kind so the
//! widget can style them differently: a failed drag snaps back with a
//! failure toast, while an unavailable provider gets its own dismissible
//! notice and must never read as a generic error.

use crate::backend::ProviderError;
use crate::model::ItemId;

/// Callbacks the engine emits toward the rendering layer.
pub trait RenderSurface: Send + Sync {
    /// Repaint these items (and only these).
    fn items_changed(&self, ids: &[ItemId]);

    /// A drag/resize was rejected by the server; the item has already
    /// snapped back. Fired exactly once per rolled-back mutation.
    fn mutation_rolled_back(&self, id: &ItemId, reason: &str);

    /// A sync attempt failed; the calendar is exactly as before it.
    fn sync_unavailable(&self, failure: &ProviderError);
}

/// Surface that ignores every notification, for headless use and tests
/// that only care about engine state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSurface;

impl RenderSurface for NullSurface {
    fn items_changed(&self, _ids: &[ItemId]) {}
    fn mutation_rolled_back(&self, _id: &ItemId, _reason: &str) {}
    fn sync_unavailable(&self, _failure: &ProviderError) {}
}
