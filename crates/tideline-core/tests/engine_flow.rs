//! Viewport refresh, visible-item queries, and create/delete flows.

mod common;

use std::sync::Arc;

use common::{at, june, raw_event, raw_task, MockApi, MockProvider, RecordingSurface};
use tideline_core::backend::NewEvent;
use tideline_core::color::Palette;
use tideline_core::config::EngineConfig;
use tideline_core::engine::{Engine, EngineError};
use tideline_core::model::{EventCategory, ItemId, ItemKind, TaskStatus};
use tideline_core::mutation::MutationError;

struct Fixture {
    api: Arc<MockApi>,
    #[allow(dead_code)]
    provider: Arc<MockProvider>,
    surface: Arc<RecordingSurface>,
    engine: Engine,
}

fn fixture_with(api: MockApi, config: EngineConfig) -> Fixture {
    let api = Arc::new(api);
    let provider = Arc::new(MockProvider::default());
    let surface = Arc::new(RecordingSurface::default());
    let engine = Engine::new(
        api.clone(),
        provider.clone(),
        surface.clone(),
        config,
    );
    Fixture {
        api,
        provider,
        surface,
        engine,
    }
}

fn fixture(api: MockApi) -> Fixture {
    fixture_with(api, EngineConfig::default())
}

#[tokio::test]
async fn refresh_unifies_events_and_deadline_tasks() {
    // One event on 06-03, one overdue task due 06-05, one task with no
    // deadline that must never surface.
    let fx = fixture(
        MockApi::new()
            .with_events(vec![raw_event(5, 3)])
            .with_tasks(vec![
                raw_task(9, Some(5), TaskStatus::Overdue),
                raw_task(10, None, TaskStatus::Todo),
            ]),
    );

    let report = fx.engine.refresh(june(1, 8)).await.expect("refresh");
    assert_eq!(report.events_fetched, 1);
    assert_eq!(report.tasks_fetched, 2);
    assert_eq!(report.changed.len(), 2);

    let visible = fx.engine.visible_items(&june(1, 8));
    let ids: Vec<String> = visible.iter().map(|item| item.id.to_string()).collect();
    assert_eq!(ids, vec!["event-5", "task-9"]);

    let palette = Palette::default();
    let event = &visible[0];
    assert_eq!(event.color, palette.category_color(EventCategory::Other));
    assert!(event.mutable);

    let task = &visible[1];
    assert_eq!(task.color, palette.status_color(TaskStatus::Overdue));
    assert!(!task.mutable);
    assert!(task.all_day);
}

#[tokio::test]
async fn refresh_is_idempotent_across_overlapping_viewports() {
    let fx = fixture(
        MockApi::new()
            .with_events(vec![raw_event(5, 3)])
            .with_tasks(vec![raw_task(9, Some(5), TaskStatus::Todo)]),
    );

    let first = fx.engine.refresh(june(1, 8)).await.expect("refresh");
    assert_eq!(first.changed.len(), 2);

    let second = fx.engine.refresh(june(1, 8)).await.expect("refresh");
    assert!(second.changed.is_empty());
    assert_eq!(fx.engine.visible_items(&june(1, 8)).len(), 2);
}

#[tokio::test]
async fn refresh_walks_task_pages() {
    let tasks: Vec<_> = (0..45)
        .map(|id| raw_task(id, Some(4), TaskStatus::Todo))
        .collect();
    let mut config = EngineConfig::default();
    config.fetch.task_page_size = 20;
    let fx = fixture_with(MockApi::new().with_tasks(tasks), config);

    let report = fx.engine.refresh(june(1, 8)).await.expect("refresh");
    // Three pages: 20 + 20 + 5.
    assert_eq!(report.tasks_fetched, 45);
    assert_eq!(fx.engine.visible_items(&june(1, 8)).len(), 45);
}

#[tokio::test]
async fn task_losing_its_deadline_leaves_the_store() {
    let fx = fixture(MockApi::new().with_tasks(vec![raw_task(9, Some(5), TaskStatus::Todo)]));
    fx.engine.refresh(june(1, 8)).await.expect("refresh");
    assert_eq!(fx.engine.visible_items(&june(1, 8)).len(), 1);

    // The deadline is cleared server-side; the next full snapshot drops it.
    *fx.api.tasks.lock().expect("tasks lock") = vec![raw_task(9, None, TaskStatus::Todo)];
    let report = fx.engine.refresh(june(1, 8)).await.expect("refresh");
    assert_eq!(report.removed, vec![ItemId::task("9")]);
    assert!(fx.engine.visible_items(&june(1, 8)).is_empty());
}

#[tokio::test]
async fn task_status_change_is_rederived_on_refresh() {
    let fx = fixture(MockApi::new().with_tasks(vec![raw_task(9, Some(5), TaskStatus::Todo)]));
    fx.engine.refresh(june(1, 8)).await.expect("refresh");

    *fx.api.tasks.lock().expect("tasks lock") = vec![raw_task(9, Some(5), TaskStatus::Overdue)];
    let report = fx.engine.refresh(june(1, 8)).await.expect("refresh");
    assert_eq!(report.changed, vec![ItemId::task("9")]);

    let item = fx.engine.item_detail(&ItemId::task("9")).expect("task");
    assert_eq!(item.payload.task_status(), Some(TaskStatus::Overdue));
    assert_eq!(item.color, Palette::default().status_color(TaskStatus::Overdue));
}

#[tokio::test]
async fn item_detail_is_a_read_only_lookup() {
    let fx = fixture(MockApi::new().with_events(vec![raw_event(5, 3)]));
    fx.engine.refresh(june(1, 8)).await.expect("refresh");

    let before = fx.engine.visible_items(&june(1, 8));
    let detail = fx.engine.item_detail(&ItemId::event("5")).expect("detail");
    assert_eq!(detail.kind, ItemKind::Event);
    assert_eq!(fx.engine.visible_items(&june(1, 8)), before);
    assert!(fx.engine.item_detail(&ItemId::event("404")).is_none());
}

#[tokio::test]
async fn create_event_lands_in_store_after_ack() {
    let fx = fixture(MockApi::new());
    let id = fx
        .engine
        .create_event(&NewEvent {
            title: "retro".to_string(),
            start: at(6, 15),
            end: at(6, 16),
            all_day: false,
            category: EventCategory::Meeting,
            color: None,
            description: None,
            location: None,
            reminder: None,
        })
        .await
        .expect("create");

    assert_eq!(id.kind(), ItemKind::Event);
    let item = fx.engine.item_detail(&id).expect("created item");
    assert_eq!(item.title, "retro");
    assert!(!fx.surface.changed_batches().is_empty());
}

#[tokio::test]
async fn create_event_rejects_inverted_interval_locally() {
    let fx = fixture(MockApi::new());
    let err = fx
        .engine
        .create_event(&NewEvent {
            title: "bad".to_string(),
            start: at(6, 16),
            end: at(6, 15),
            all_day: false,
            category: EventCategory::Other,
            color: None,
            description: None,
            location: None,
            reminder: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Mutation(MutationError::InvalidInterval(_))
    ));
}

#[tokio::test]
async fn delete_event_removes_after_ack() {
    let fx = fixture(MockApi::new().with_events(vec![raw_event(5, 3)]));
    fx.engine.refresh(june(1, 8)).await.expect("refresh");

    fx.engine
        .delete_event(&ItemId::event("5"))
        .await
        .expect("delete");
    assert!(fx.engine.item_detail(&ItemId::event("5")).is_none());
    assert_eq!(
        *fx.api.deleted.lock().expect("deleted lock"),
        vec!["5".to_string()]
    );
}

#[tokio::test]
async fn delete_rejects_task_items() {
    let fx = fixture(MockApi::new().with_tasks(vec![raw_task(9, Some(5), TaskStatus::Todo)]));
    fx.engine.refresh(june(1, 8)).await.expect("refresh");

    let err = fx
        .engine
        .delete_event(&ItemId::task("9"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Mutation(MutationError::ReadOnly(_))
    ));
    assert!(fx.api.deleted.lock().expect("deleted lock").is_empty());
    assert!(fx.engine.item_detail(&ItemId::task("9")).is_some());
}

#[tokio::test]
async fn reset_clears_page_lifetime_state() {
    let fx = fixture(MockApi::new().with_events(vec![raw_event(5, 3)]));
    fx.engine.refresh(june(1, 8)).await.expect("refresh");
    assert!(!fx.engine.visible_items(&june(1, 8)).is_empty());

    fx.engine.reset();
    assert!(fx.engine.visible_items(&june(1, 8)).is_empty());
}
