//! Local state database: status marks, processed-folder cache, run marker.

mod connection;
mod processed;
mod run_lock;
mod status;

pub use connection::{open_db, open_db_in_memory};
pub use processed::{add_processed_folder, load_processed_folders};
pub use run_lock::{RunGuard, acquire_run_lock, is_running, release_run_lock};
pub use status::{SqliteStatusStore, mark_reviewed};

/// WAL tuning pragmas. Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        "#;

/// Schema for status marks, processed folders and the single run-state row.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sheet_status (
    sheet_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    reason TEXT NOT NULL,
    resolution TEXT NOT NULL,
    is_reviewed INTEGER NOT NULL DEFAULT 0,
    marked_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS processed_folders (
    name TEXT PRIMARY KEY,
    processed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS run_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    running INTEGER NOT NULL DEFAULT 0,
    pid INTEGER,
    started_at TEXT
);
INSERT OR IGNORE INTO run_state (id, running) VALUES (1, 0);
"#;
