//! Canonical data model shared by every engine component.

pub mod item;
pub mod item_id;

pub use item::{
    EventCategory, EventDetails, ItemKind, ItemPayload, Origin, TaskDetails, TaskStatus,
    TimelineItem,
};
pub use item_id::{ItemId, ParseItemIdError};
