//! End-to-end sweep tests against in-memory fakes.

mod common;

use chrono::{Datelike, Utc};
use common::{
    FakeInventory, FakeOracle, FakePurchaseOrders, FakeSheets, FakeStore, RecordingSleeper, file, rows,
};
use costsweep::{OpportunityState, SubmissionMode};
use costsweep::engine::cost_sheet::OFFER_TEMPLATE_RANGE;
use costsweep::engine::db_ops::{
    SqliteStatusStore, add_processed_folder, load_processed_folders, open_db_in_memory,
};
use costsweep::engine::resolver::{ACCEPTED_OFFER_CELL, is_fatal};
use costsweep::engine::retry::{RetryPolicy, ThreadSleeper};
use costsweep::engine::run::{
    LOSSES_FOLDER_NAME, SweepOptions, SweepServices, is_candidate_folder, sweep, wins_folder_name,
};
use costsweep::remote::RemoteStore;
use std::sync::Arc;
use std::time::Duration;

fn options() -> SweepOptions {
    SweepOptions {
        root_folder_id: "root".into(),
        procurement_folder_id: "proc".into(),
        template_id: "template".into(),
        workers: 3,
        inter_item_delay: Duration::ZERO,
        staleness_days: 60,
        retry: RetryPolicy::default(),
        submission: SubmissionMode::Inventory,
        show_progress: false,
    }
}

fn cost_sheet_values() -> costsweep::remote::Rows {
    let mut values = vec![vec!["header".to_string(); 16]];
    for (sku, cost) in [("S1", "$10.00"), ("S2", "$20.50"), ("S3", "$1,000")] {
        let mut row = vec![String::new(); 16];
        row[0] = "Dell".into();
        row[3] = "1".into();
        row[6] = "0".into();
        row[9] = "FALSE".into();
        row[10] = sku.into();
        row[15] = cost.into();
        values.push(row);
    }
    values
}

fn procurement_store() -> FakeStore {
    FakeStore::default()
        .with_folders(
            "proc",
            vec![
                file("f1", "Acme-Widgets-1", 5),
                file("f2", "Beta-Gadgets-2", 5),
                file("f3", "Gamma-Thing-3", 5),
                file("f4", "misc", 5),
                file("f5", "Done-Already-4", 5),
            ],
        )
        .with_files("f1", vec![vec![file("c1", "Acme - Cost Sheet - 2026-01-01", 5)]])
        .with_files("f2", vec![vec![file("p2", "Beta-Gadgets-2", 90)]])
        .with_files("f3", vec![vec![file("p3", "Gamma-Thing-3", 90)]])
}

#[test]
fn test_candidate_folder_names() {
    assert!(is_candidate_folder("Acme-Widgets-1"));
    assert!(is_candidate_folder("a-b-c-d"));
    assert!(!is_candidate_folder("a-b"));
    assert!(!is_candidate_folder("misc"));
}

#[test]
fn test_sweep_settles_every_candidate_folder() {
    let store = Arc::new(procurement_store());
    let sheets = FakeSheets::default().with_range("c1", OFFER_TEMPLATE_RANGE, cost_sheet_values());
    let oracle = FakeOracle::default()
        .with_state("2", OpportunityState::Lost)
        .with_state("3", OpportunityState::Suspended);
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();
    add_processed_folder(&conn, "Done-Already-4").unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: None,
        sleeper: &sleeper,
    };
    let stats = sweep(&services, &options(), &conn).unwrap();

    let wins = wins_folder_name(Utc::now().year());
    assert_eq!(
        store.created(),
        vec![
            (wins, "root".to_string()),
            (LOSSES_FOLDER_NAME.to_string(), "root".to_string())
        ]
    );

    let mut moves = store.moves();
    moves.sort();
    assert_eq!(
        moves,
        vec![
            ("f1".to_string(), "proc".to_string(), "new-folder-1".to_string()),
            ("f2".to_string(), "proc".to_string(), "new-folder-2".to_string()),
        ]
    );

    let chunks = inventory.chunks();
    assert_eq!(chunks.len(), 1);
    let costs: Vec<f64> = chunks[0].iter().map(|i| i.cost).collect();
    assert_eq!(costs, vec![10.0, 20.0, 1000.0]);

    let processed = load_processed_folders(&conn).unwrap();
    assert!(processed.contains("Acme-Widgets-1"));
    assert!(processed.contains("Beta-Gadgets-2"));
    assert!(!processed.contains("Gamma-Thing-3"));

    assert_eq!(stats.total_folders, 3);
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.skipped_without_delay, 1);
    assert_eq!(stats.sheets_submitted, 1);
    assert_eq!(stats.items_submitted, 3);
    assert_eq!(stats.folders_lost, 1);
    assert_eq!(stats.failures, 0);
    assert!(sleeper.delays().is_empty());
}

#[test]
fn test_sweep_reuses_existing_destination_folders() {
    let wins = wins_folder_name(Utc::now().year());
    let store = Arc::new(procurement_store().with_folders(
        "root",
        vec![file("w", &wins, 100), file("l", LOSSES_FOLDER_NAME, 100)],
    ));
    let sheets = FakeSheets::default().with_range("c1", OFFER_TEMPLATE_RANGE, cost_sheet_values());
    let oracle = FakeOracle::default()
        .with_state("2", OpportunityState::Won)
        .with_state("3", OpportunityState::Won);
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: None,
        sleeper: &sleeper,
    };
    let stats = sweep(&services, &options(), &conn).unwrap();
    assert!(store.created().is_empty());
    assert!(store.moves().iter().all(|(_, _, to)| to == "w"));
    assert_eq!(store.moves().len(), 3);
    assert_eq!(stats.folders_won, 2);
}

#[test]
fn test_sweep_continues_after_item_failure() {
    // f2's pricing sheet has an offer but no readable title, so synthesis fails.
    let store = Arc::new(procurement_store());
    let sheets = FakeSheets::default()
        .with_range("c1", OFFER_TEMPLATE_RANGE, cost_sheet_values())
        .with_range("p2", ACCEPTED_OFFER_CELL, rows(&[&["$300"]]));
    let oracle = FakeOracle::default().with_state("3", OpportunityState::Open);
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: None,
        sleeper: &sleeper,
    };
    let mut opts = options();
    opts.retry.base_delay = Duration::from_millis(1);
    let stats = sweep(&services, &opts, &conn).unwrap();
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.processed, 4);
    assert_eq!(stats.sheets_submitted, 1);
}

#[test]
fn test_sweep_malformed_offer_aborts() {
    let store = Arc::new(procurement_store());
    let sheets = FakeSheets::default()
        .with_range("c1", OFFER_TEMPLATE_RANGE, cost_sheet_values())
        .with_range("p2", ACCEPTED_OFFER_CELL, rows(&[&["TBD"]]))
        .with_range("p3", ACCEPTED_OFFER_CELL, rows(&[&["TBD"]]));
    let oracle = FakeOracle::default();
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: None,
        sleeper: &sleeper,
    };
    let err = sweep(&services, &options(), &conn).unwrap_err();
    assert!(is_fatal(&err), "{err:#}");
    assert_eq!(oracle.calls(), 0);
}

#[test]
fn test_sweep_procurement_listing_failure_is_fatal() {
    let store = Arc::new(procurement_store().failing_on("proc"));
    let sheets = FakeSheets::default();
    let oracle = FakeOracle::default();
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: None,
        sleeper: &sleeper,
    };
    assert!(sweep(&services, &options(), &conn).is_err());
    assert!(inventory.chunks().is_empty());
}

// --- purchase-order submission ---

fn cost_sheet_only_store() -> FakeStore {
    FakeStore::default()
        .with_folders(
            "proc",
            vec![file("f1", "Acme-Widgets-1", 5), file("f2", "Beta-Gadgets-2", 5)],
        )
        .with_files("f1", vec![vec![file("c1", "Acme - Cost Sheet - 2026-01-01", 5)]])
        .with_files("f2", vec![vec![file("c2", "Beta - Cost Sheet - 2026-01-01", 5)]])
}

#[test]
fn test_sweep_purchase_orders_move_created_and_existing() {
    let store = Arc::new(cost_sheet_only_store());
    let sheets = FakeSheets::default();
    let oracle = FakeOracle::default();
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let orders = FakePurchaseOrders::replying(&[
        (false, "PO Created Successfully"),
        (true, "PO Already Exists"),
    ]);
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: Some(&orders),
        sleeper: &sleeper,
    };
    let mut opts = options();
    opts.submission = SubmissionMode::PurchaseOrder;
    let stats = sweep(&services, &opts, &conn).unwrap();

    assert_eq!(store.moves().len(), 2);
    assert!(inventory.chunks().is_empty());
    assert_eq!(orders.urls().len(), 2);
    assert!(orders.urls().iter().all(|u| u.ends_with("/edit#gid=0")));
    assert_eq!(stats.po_calls, 2);
    assert_eq!(stats.pos_generated, 1);
    assert_eq!(load_processed_folders(&conn).unwrap().len(), 2);
}

#[test]
fn test_sweep_purchase_order_bad_gateway_is_retried() {
    let store = Arc::new(cost_sheet_only_store());
    let sheets = FakeSheets::default();
    let oracle = FakeOracle::default();
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let bad_gateway = "Error updating sheet: Request failed with status code 502";
    // Every upload first meets the 502 reply: three for the first sheet exhaust its retries,
    // one for the second is followed by success.
    let orders = FakePurchaseOrders::replying(&[
        (true, bad_gateway),
        (true, bad_gateway),
        (true, bad_gateway),
        (true, bad_gateway),
    ]);
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: Some(&orders),
        sleeper: &sleeper,
    };
    let mut opts = options();
    opts.submission = SubmissionMode::PurchaseOrder;
    let stats = sweep(&services, &opts, &conn).unwrap();

    assert_eq!(stats.po_calls, 5);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.pos_generated, 1);
    assert_eq!(store.moves().len(), 1);
}

#[test]
fn test_sweep_purchase_order_rejection_leaves_folder() {
    let store = Arc::new(cost_sheet_only_store());
    let sheets = FakeSheets::default();
    let oracle = FakeOracle::default();
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let orders = FakePurchaseOrders::replying(&[
        (true, "Supplier Name could not be determined"),
        (true, "Supplier Name could not be determined"),
    ]);
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: Some(&orders),
        sleeper: &sleeper,
    };
    let mut opts = options();
    opts.submission = SubmissionMode::PurchaseOrder;
    let stats = sweep(&services, &opts, &conn).unwrap();

    assert!(store.moves().is_empty());
    assert_eq!(stats.po_calls, 2);
    assert_eq!(stats.failures, 0);
    assert!(load_processed_folders(&conn).unwrap().is_empty());
}

#[test]
fn test_sweep_purchase_orders_need_a_client() {
    let store = Arc::new(cost_sheet_only_store());
    let sheets = FakeSheets::default();
    let oracle = FakeOracle::default();
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let sleeper = RecordingSleeper::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: None,
        sleeper: &sleeper,
    };
    let mut opts = options();
    opts.submission = SubmissionMode::PurchaseOrder;
    assert!(sweep(&services, &opts, &conn).is_err());
    assert!(store.created().is_empty());
}

// --- timing ---

#[test]
fn test_retry_sleeps_are_not_counted_as_waiting() {
    let store = Arc::new(procurement_store());
    let sheets = FakeSheets::default()
        .failing_reads(&[503])
        .with_range("c1", OFFER_TEMPLATE_RANGE, cost_sheet_values());
    let oracle = FakeOracle::default()
        .with_state("2", OpportunityState::Lost)
        .with_state("3", OpportunityState::Suspended);
    let status = SqliteStatusStore::new(open_db_in_memory().unwrap());
    let inventory = FakeInventory::default();
    let conn = open_db_in_memory().unwrap();

    let services = SweepServices {
        store: store.clone() as Arc<dyn RemoteStore>,
        sheets: &sheets,
        oracle: &oracle,
        status: &status,
        inventory: &inventory,
        purchase_orders: None,
        sleeper: &ThreadSleeper,
    };
    let mut opts = options();
    opts.retry.base_delay = Duration::from_millis(200);
    let stats = sweep(&services, &opts, &conn).unwrap();

    assert!(stats.time_sleeping >= Duration::from_millis(200));
    let waiting = stats.time_waiting_for_offers + stats.time_waiting_for_submission;
    assert!(waiting < Duration::from_millis(150), "{waiting:?}");
    assert_eq!(stats.sheets_submitted, 1);
}
