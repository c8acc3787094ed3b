//! Viewport → backend query planning.
//!
//! A viewport change needs exactly two backend queries: a range query for
//! events and an unfiltered paged walk for tasks (the task backend has no
//! server-side deadline filter; deadline-less tasks are dropped after
//! normalization). The planner only produces parameters — it holds no
//! cache and issues no requests; caching is the store's job and fetching
//! is the engine's.

use serde::{Deserialize, Serialize};

use crate::config::FetchConfig;
use crate::range::DateRange;

/// Parameters of the event range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRangeQuery {
    pub range: DateRange,
}

/// Parameters of the paged, unfiltered task walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPageQuery {
    /// Records per page. A page shorter than this is the last one.
    pub page_size: usize,
    /// Upper bound on pages walked in one refresh.
    pub max_pages: u32,
}

/// The queries needed to populate one viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub events: EventRangeQuery,
    pub tasks: TaskPageQuery,
}

impl QueryPlan {
    /// Plan the fetches for a visible viewport.
    #[must_use]
    pub const fn for_viewport(viewport: DateRange, fetch: &FetchConfig) -> Self {
        Self {
            events: EventRangeQuery { range: viewport },
            tasks: TaskPageQuery {
                page_size: fetch.task_page_size,
                max_pages: fetch.max_task_pages,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn plan_carries_viewport_and_page_size() {
        let viewport = DateRange::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).single().expect("date"),
            Utc.with_ymd_and_hms(2024, 6, 8, 0, 0, 0).single().expect("date"),
        )
        .expect("range");
        let fetch = FetchConfig {
            task_page_size: 25,
            max_task_pages: 4,
        };

        let plan = QueryPlan::for_viewport(viewport, &fetch);
        assert_eq!(plan.events.range, viewport);
        assert_eq!(plan.tasks.page_size, 25);
        assert_eq!(plan.tasks.max_pages, 4);
    }
}
