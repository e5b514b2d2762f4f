use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use taskboard_core::{
    CancelFlag, Category, OpContext, StoreConfig, StoreError, TaskStore, TaskValidationError,
    UnavailableReason,
};
use uuid::Uuid;

fn open_store() -> TaskStore {
    TaskStore::open(&StoreConfig::in_memory()).unwrap()
}

fn open_file_store(path: &Path) -> TaskStore {
    let mut config = StoreConfig::file(path);
    config.busy_timeout = Duration::from_secs(3);
    TaskStore::open(&config).unwrap()
}

/// Second connection holding the write lock until rolled back.
fn lock_exclusively(path: &Path) -> Connection {
    let blocker = Connection::open(path).unwrap();
    blocker.execute_batch("BEGIN EXCLUSIVE;").unwrap();
    blocker
}

fn total(store: &TaskStore) -> usize {
    let ctx = OpContext::new();
    Category::ALL
        .iter()
        .map(|category| store.list_by_category(&ctx, *category).unwrap().len())
        .sum()
}

#[test]
fn created_task_is_listed_once_and_not_done() {
    let store = open_store();
    let ctx = OpContext::new();

    let created = store.create(&ctx, "Buy milk", Category::Today).unwrap();
    assert!(!created.done);

    let today = store.list_by_category(&ctx, Category::Today).unwrap();
    let matching: Vec<_> = today.iter().filter(|task| task.name == "Buy milk").collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].id, created.id);
    assert!(!matching[0].done);
}

#[test]
fn listing_counts_created_minus_deleted_per_category() {
    let store = open_store();
    let ctx = OpContext::new();

    let work_a = store.create(&ctx, "a", Category::Work).unwrap();
    store.create(&ctx, "b", Category::Work).unwrap();
    store.create(&ctx, "c", Category::Today).unwrap();
    store.toggle_done(&ctx, work_a.id, false).unwrap();
    store.delete_completed(&ctx, Category::Work).unwrap();

    let work = store.list_by_category(&ctx, Category::Work).unwrap();
    assert_eq!(work.len(), 1);
    assert!(work.iter().all(|task| task.category == Category::Work));
    let today = store.list_by_category(&ctx, Category::Today).unwrap();
    assert_eq!(today.len(), 1);
    assert!(today.iter().all(|task| task.category == Category::Today));
}

#[test]
fn toggle_sets_negation_of_hint_and_round_trips() {
    let store = open_store();
    let ctx = OpContext::new();
    let task = store.create(&ctx, "flip", Category::Today).unwrap();

    store.toggle_done(&ctx, task.id, false).unwrap();
    let listed = store.list_by_category(&ctx, Category::Today).unwrap();
    assert!(listed[0].done);

    store.toggle_done(&ctx, task.id, true).unwrap();
    let listed = store.list_by_category(&ctx, Category::Today).unwrap();
    assert!(!listed[0].done);
}

#[test]
fn toggle_trusts_a_stale_hint() {
    let store = open_store();
    let ctx = OpContext::new();
    let task = store.create(&ctx, "stale", Category::Work).unwrap();

    // Caller believes the task is done although it is not: it gets cleared.
    store.toggle_done(&ctx, task.id, true).unwrap();
    let listed = store.list_by_category(&ctx, Category::Work).unwrap();
    assert!(!listed[0].done);
}

#[test]
fn toggle_unknown_id_is_not_found_and_changes_nothing() {
    let store = open_store();
    let ctx = OpContext::new();
    store.create(&ctx, "untouched", Category::Today).unwrap();

    let unknown = Uuid::new_v4();
    let err = store.toggle_done(&ctx, unknown, false).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == unknown));

    let today = store.list_by_category(&ctx, Category::Today).unwrap();
    assert_eq!(today.len(), 1);
    assert!(!today[0].done);
}

#[test]
fn delete_completed_removes_done_keeps_open_and_is_idempotent() {
    let store = open_store();
    let ctx = OpContext::new();
    let a = store.create(&ctx, "A", Category::Work).unwrap();
    let b = store.create(&ctx, "B", Category::Work).unwrap();
    store.toggle_done(&ctx, a.id, false).unwrap();

    store.delete_completed(&ctx, Category::Work).unwrap();
    let work = store.list_by_category(&ctx, Category::Work).unwrap();
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].id, b.id);

    store.delete_completed(&ctx, Category::Work).unwrap();
    assert_eq!(store.list_by_category(&ctx, Category::Work).unwrap().len(), 1);
}

#[test]
fn delete_completed_leaves_other_categories_alone() {
    let store = open_store();
    let ctx = OpContext::new();
    let today = store.create(&ctx, "done today", Category::Today).unwrap();
    store.toggle_done(&ctx, today.id, false).unwrap();

    store.delete_completed(&ctx, Category::Work).unwrap();
    assert_eq!(store.list_by_category(&ctx, Category::Today).unwrap().len(), 1);
}

#[test]
fn empty_name_is_a_validation_error_and_writes_nothing() {
    let store = open_store();
    let ctx = OpContext::new();
    store.create(&ctx, "existing", Category::Today).unwrap();
    let before = total(&store);

    let err = store.create(&ctx, "", Category::Today).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(TaskValidationError::EmptyName)
    ));
    assert_eq!(total(&store), before);
}

#[test]
fn unknown_category_input_is_a_validation_error() {
    let err: StoreError = "someday".parse::<Category>().unwrap_err().into();
    assert!(matches!(
        err,
        StoreError::Validation(TaskValidationError::UnknownCategory(_))
    ));
}

#[test]
fn expired_deadline_aborts_without_mutation() {
    let store = open_store();
    let expired = OpContext::new().deadline(Instant::now() - Duration::from_millis(1));

    let err = store.create(&expired, "late", Category::Today).unwrap_err();
    assert!(matches!(
        err,
        StoreError::StorageUnavailable(UnavailableReason::DeadlineExceeded)
    ));
    assert_eq!(total(&store), 0);
}

#[test]
fn cancelled_context_aborts_without_mutation() {
    let store = open_store();
    let ctx = OpContext::new();
    let task = store.create(&ctx, "keep", Category::Work).unwrap();

    let flag = CancelFlag::new();
    flag.cancel();
    let cancelled = OpContext::new().cancel_on(flag);
    let err = store.toggle_done(&cancelled, task.id, false).unwrap_err();
    assert!(matches!(
        err,
        StoreError::StorageUnavailable(UnavailableReason::Cancelled)
    ));
    assert_eq!(err.code(), "cancelled");

    let work = store.list_by_category(&ctx, Category::Work).unwrap();
    assert!(!work[0].done);
}

#[test]
fn shutdown_is_idempotent_and_closes_the_store() {
    let store = open_store();
    assert!(store.is_open());

    store.shutdown().unwrap();
    store.shutdown().unwrap();
    assert!(!store.is_open());

    let err = store
        .list_by_category(&OpContext::new(), Category::Today)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::StorageUnavailable(UnavailableReason::Closed)
    ));
}

#[test]
fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("tasks.db"));
    let ctx = OpContext::new();

    let created = {
        let store = TaskStore::open(&config).unwrap();
        let created = store.create(&ctx, "survive", Category::Work).unwrap();
        store.toggle_done(&ctx, created.id, false).unwrap();
        store.shutdown().unwrap();
        created
    };

    let store = TaskStore::open(&config).unwrap();
    let work = store.list_by_category(&ctx, Category::Work).unwrap();
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].id, created.id);
    assert!(work[0].done);
}

#[test]
fn open_fails_fast_for_unreachable_location() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("missing").join("tasks.db"));

    let err = TaskStore::open(&config).err().expect("open should fail");
    assert!(matches!(
        err,
        StoreError::StorageUnavailable(UnavailableReason::Backend(_))
    ));
}

#[test]
fn concurrent_creates_all_land_with_distinct_ids() {
    let store = Arc::new(open_store());
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let ctx = OpContext::with_timeout(Duration::from_secs(10));
                (0..10)
                    .map(|n| {
                        store
                            .create(&ctx, &format!("w{worker}-{n}"), Category::Work)
                            .unwrap()
                            .id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 80);
    assert_eq!(
        store
            .list_by_category(&OpContext::new(), Category::Work)
            .unwrap()
            .len(),
        80
    );
}

#[test]
fn busy_wait_stops_at_the_deadline_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");
    let store = open_file_store(&path);
    let blocker = lock_exclusively(&path);

    let started = Instant::now();
    let err = store
        .create(
            &OpContext::with_timeout(Duration::from_millis(200)),
            "blocked",
            Category::Today,
        )
        .unwrap_err();
    let waited = started.elapsed();
    assert!(matches!(
        err,
        StoreError::StorageUnavailable(UnavailableReason::DeadlineExceeded)
    ));
    assert_eq!(err.code(), "deadline_exceeded");
    assert!(waited >= Duration::from_millis(150), "returned after {waited:?}");
    assert!(waited < Duration::from_secs(1), "returned after {waited:?}");

    blocker.execute_batch("ROLLBACK;").unwrap();
    assert_eq!(total(&store), 0);
}

#[test]
fn deadline_capped_busy_wait_does_not_leak_into_later_operations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");
    let store = open_file_store(&path);

    let blocker = lock_exclusively(&path);
    let short = OpContext::with_timeout(Duration::from_millis(50));
    assert!(store.create(&short, "early", Category::Work).is_err());
    blocker.execute_batch("ROLLBACK;").unwrap();

    // Lock held longer than the earlier deadline but well inside the busy timeout.
    let blocker = lock_exclusively(&path);
    let release = thread::spawn(move || {
        thread::sleep(Duration::from_millis(400));
        blocker.execute_batch("ROLLBACK;").unwrap();
    });
    let created = store.create(&OpContext::new(), "later", Category::Work);
    release.join().unwrap();

    let created = created.unwrap();
    let work = store.list_by_category(&OpContext::new(), Category::Work).unwrap();
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].id, created.id);
}

#[test]
fn waiting_behind_a_blocked_operation_honours_the_deadline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");
    let store = Arc::new(open_file_store(&path));
    let blocker = lock_exclusively(&path);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.create(&OpContext::new(), "slow", Category::Work))
    };
    // Let the writer take the handle and start its busy wait.
    thread::sleep(Duration::from_millis(200));

    let started = Instant::now();
    let err = store
        .list_by_category(
            &OpContext::with_timeout(Duration::from_millis(200)),
            Category::Today,
        )
        .unwrap_err();
    let waited = started.elapsed();
    assert!(matches!(
        err,
        StoreError::StorageUnavailable(UnavailableReason::DeadlineExceeded)
    ));
    assert!(waited < Duration::from_secs(1), "returned after {waited:?}");

    blocker.execute_batch("ROLLBACK;").unwrap();
    writer.join().unwrap().unwrap();
    assert_eq!(total(&store), 1);
}

#[test]
fn cancelling_a_waiting_operation_releases_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");
    let store = Arc::new(open_file_store(&path));
    let blocker = lock_exclusively(&path);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.create(&OpContext::new(), "slow", Category::Work))
    };
    thread::sleep(Duration::from_millis(200));

    let flag = CancelFlag::new();
    let waiter = {
        let store = Arc::clone(&store);
        let ctx = OpContext::new().cancel_on(flag.clone());
        thread::spawn(move || store.create(&ctx, "queued", Category::Work))
    };
    thread::sleep(Duration::from_millis(100));
    flag.cancel();

    let err = waiter.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        StoreError::StorageUnavailable(UnavailableReason::Cancelled)
    ));

    blocker.execute_batch("ROLLBACK;").unwrap();
    writer.join().unwrap().unwrap();
    let work = store.list_by_category(&OpContext::new(), Category::Work).unwrap();
    assert_eq!(work.len(), 1);
    assert_eq!(work[0].name, "slow");
}
