//! Scan pool tests: one result per job, pagination, fatal listing failures.

mod common;

use common::{FakeStore, file};
use costsweep::pipeline::{PoolTuning, scan_folder, scan_folders, start_pool};
use costsweep::remote::RemoteStore;
use costsweep::FolderJob;
use std::collections::HashSet;
use std::sync::Arc;

fn five_folder_store() -> FakeStore {
    let mut store = FakeStore::default();
    for i in 0..5 {
        store = store.with_files(
            &format!("folder-{i}"),
            vec![vec![file(&format!("f{i}"), &format!("A-B-{i}"), i)]],
        );
    }
    store
}

// --- start_pool / completion ---

#[test]
fn test_pool_each_job_yields_exactly_one_result() {
    let store: Arc<dyn RemoteStore> = Arc::new(five_folder_store());
    let handles = start_pool(store, PoolTuning::new(2, 5));
    for i in 0..5 {
        handles.submit(FolderJob::new(format!("folder-{i}"))).unwrap();
    }
    let (result_rx, completion) = handles.close_jobs();
    let results: Vec<_> = result_rx.iter().collect();
    let summary = completion.wait().unwrap();

    assert_eq!(summary.workers, 2);
    assert_eq!(summary.jobs_completed, 5);
    assert_eq!(results.len(), 5);
    let ids: HashSet<_> = results.iter().map(|r| r.parent_folder_id.clone()).collect();
    assert_eq!(ids.len(), 5);
    for i in 0..5 {
        assert!(ids.contains(&format!("folder-{i}")));
    }
}

#[test]
fn test_pool_tuning_clamps_to_one() {
    let tuning = PoolTuning::new(0, 0);
    assert_eq!(tuning.worker_count, 1);
    assert_eq!(tuning.job_capacity, 1);
}

#[test]
fn test_scan_folders_empty_input() {
    let store: Arc<dyn RemoteStore> = Arc::new(FakeStore::default());
    let results = scan_folders(store, &[], 4).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_scan_folders_more_workers_than_jobs() {
    let store: Arc<dyn RemoteStore> = Arc::new(five_folder_store());
    let ids: Vec<String> = (0..5).map(|i| format!("folder-{i}")).collect();
    let results = scan_folders(store, &ids, 10).unwrap();
    assert_eq!(results.len(), 5);
}

// --- scan_folder ---

#[test]
fn test_scan_folder_follows_page_tokens() {
    let store = FakeStore::default().with_files(
        "opp",
        vec![
            vec![file("a", "one", 3), file("b", "two", 3)],
            vec![file("c", "three", 3)],
            vec![file("d", "four", 3)],
        ],
    );
    let result = scan_folder(&store, "opp").unwrap();
    let names: Vec<_> = result.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two", "three", "four"]);
    assert_eq!(result.entry_count, 4);
    assert_eq!(store.list_calls.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[test]
fn test_scan_folder_age_from_oldest_child() {
    let store = FakeStore::default().with_files(
        "opp",
        vec![vec![file("a", "new", 2), file("b", "old", 75), file("c", "mid", 30)]],
    );
    let result = scan_folder(&store, "opp").unwrap();
    assert_eq!(result.age_days, 75);
}

#[test]
fn test_scan_folder_empty_folder_has_age_zero() {
    let store = FakeStore::default();
    let result = scan_folder(&store, "empty").unwrap();
    assert_eq!(result.entry_count, 0);
    assert_eq!(result.age_days, 0);
}

// --- fatal listing failure ---

#[test]
fn test_scan_folders_listing_failure_is_fatal() {
    let store: Arc<dyn RemoteStore> = Arc::new(five_folder_store().failing_on("folder-3"));
    let ids: Vec<String> = (0..5).map(|i| format!("folder-{i}")).collect();
    let err = scan_folders(store, &ids, 2).unwrap_err();
    assert!(err.to_string().contains("folder-3"), "{err}");
}
