//! Names of folders already handled by a previous run.

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, params};
use std::collections::HashSet;

pub fn load_processed_folders(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT name FROM processed_folders")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut names = HashSet::new();
    for row in rows {
        names.insert(row?);
    }
    Ok(names)
}

/// Record `name` as processed. Returns false when it was already recorded.
pub fn add_processed_folder(conn: &Connection, name: &str) -> Result<bool> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO processed_folders (name, processed_at) VALUES (?1, ?2)",
        params![name, Utc::now().to_rfc3339()],
    )?;
    Ok(n > 0)
}
