use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use taskmgr_core::calendar::Cell;
use taskmgr_core::clock::ManualClock;
use taskmgr_core::controller::Controller;
use taskmgr_core::filter::{FilterKey, filter};
use taskmgr_core::storage::{FileStore, KeyValueStore};
use taskmgr_core::store::{TASKS_STORAGE_KEY, TaskStore};
use taskmgr_core::{Priority, TaskDraft};
use tempfile::tempdir;

#[test]
fn file_store_roundtrip_keeps_every_field() {
    let temp = tempdir().expect("tempdir");
    let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap();

    let mut store = TaskStore::load(FileStore::open(temp.path()).expect("open store"));
    store
        .add(
            TaskDraft::new("Write parity harness")
                .with_description("compare grids")
                .with_priority(Priority::Low)
                .with_due_date(NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()),
            now,
        )
        .expect("add");
    store
        .add(TaskDraft::new("No extras"), now + Duration::milliseconds(5))
        .expect("add");
    let saved = store.list().to_vec();

    let reopened = TaskStore::load(FileStore::open(temp.path()).expect("reopen store"));
    assert_eq!(reopened.list(), saved.as_slice());
    assert_eq!(reopened.list()[1].description, None);
    assert_eq!(reopened.list()[1].due_date, None);
    assert_eq!(reopened.list()[1].priority, Priority::Medium);
}

#[test]
fn stored_blob_without_optional_fields_loads() {
    let temp = tempdir().expect("tempdir");
    let mut backend = FileStore::open(temp.path()).expect("open store");
    backend
        .set(
            TASKS_STORAGE_KEY,
            r#"[{"id":"1760864400000","title":"Bare","createdAt":"2026-10-19T09:00:00.000Z"}]"#,
        )
        .expect("seed");

    let store = TaskStore::load(backend);
    let task = &store.list()[0];
    assert_eq!(task.title, "Bare");
    assert_eq!(task.priority, Priority::Medium);
    assert!(!task.completed);
    assert_eq!(task.due_date, None);
}

#[test]
fn high_priority_rent_due_tomorrow_then_completed() {
    let temp = tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
    ));
    let store = TaskStore::load(FileStore::open(temp.path()).expect("open store"));
    let mut controller = Controller::new(store, Utc, clock.clone());

    let tomorrow = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
    let rent = controller
        .add(
            TaskDraft::new("Pay rent")
                .with_priority(Priority::High)
                .with_due_date(tomorrow),
        )
        .expect("add rent");

    let tasks = controller.tasks();
    assert_eq!(filter(tasks, FilterKey::High).len(), 1);
    assert_eq!(filter(tasks, FilterKey::Active).len(), 1);
    assert!(filter(tasks, FilterKey::Completed).is_empty());

    let cell = controller
        .views()
        .grid
        .iter()
        .filter_map(Cell::as_day)
        .find(|cell| cell.date == tomorrow)
        .expect("cell for tomorrow");
    assert!(cell.has_tasks);
    let indicators = cell.indicators(controller.indicator_limit());
    assert_eq!(indicators.markers.len(), 1);
    assert_eq!(indicators.markers[0].priority, Priority::High);

    let countdown = controller.countdown(&rent.id).expect("pending countdown");
    assert!(!countdown.is_overdue());
    assert_eq!(countdown.text, "15h 0m 0s");

    clock.advance(Duration::seconds(30));
    assert!(controller.toggle(&rent.id).expect("toggle"));

    let tasks = controller.tasks();
    assert!(filter(tasks, FilterKey::Active).is_empty());
    assert_eq!(filter(tasks, FilterKey::Completed).len(), 1);
    assert_eq!(controller.countdown(&rent.id), None);
    assert_eq!(controller.views().stats.completion_percent, 100);

    let reopened = TaskStore::load(FileStore::open(temp.path()).expect("reopen store"));
    assert!(reopened.get(&rent.id).expect("persisted").completed);
}

#[test]
fn overdue_after_local_midnight_passes() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
    ));
    let temp = tempdir().expect("tempdir");
    let store = TaskStore::load(FileStore::open(temp.path()).expect("open store"));
    let mut controller = Controller::new(store, chrono_tz::Europe::Berlin, clock.clone());

    let task = controller
        .add(TaskDraft::new("File taxes").with_due_date(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()))
        .expect("add");

    // Berlin midnight of the 19th was 22:00 UTC on the 18th.
    let countdown = controller.countdown(&task.id).expect("countdown");
    assert!(countdown.is_overdue());
    assert_eq!(countdown.text, "11h 0m overdue");
}
