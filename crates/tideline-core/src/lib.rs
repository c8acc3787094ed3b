//! tideline-core: unified timeline aggregation and optimistic
//! rescheduling for calendar dashboards.
//!
//! The engine merges two structurally different streams — explicit
//! calendar events and deadline-bearing tasks — into one canonical
//! [`model::TimelineItem`] shape, caches them in a range-queried
//! [`store::TimelineStore`], applies drag/resize reschedules optimistically
//! with rollback on rejection, and reconciles an external calendar
//! provider's snapshots without duplicating local records.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per concern; `anyhow::Result`
//!   only at config/binary boundaries.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod backend;
pub mod color;
pub mod config;
pub mod engine;
pub mod model;
pub mod mutation;
pub mod normalize;
pub mod planner;
pub mod range;
pub mod store;
pub mod surface;
pub mod sync;

pub use backend::{CalendarProvider, DashboardApi};
pub use engine::Engine;
pub use model::{ItemId, TimelineItem};
pub use range::DateRange;
