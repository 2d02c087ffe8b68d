//! Single-instance run marker kept in the `run_state` row.

use anyhow::{Result, bail};
use chrono::Utc;
use rusqlite::{Connection, params};

/// Whether another run currently holds the marker.
pub fn is_running(conn: &Connection) -> Result<bool> {
    let running: i64 = conn.query_row("SELECT running FROM run_state WHERE id = 1", [], |row| {
        row.get(0)
    })?;
    Ok(running != 0)
}

/// Set the marker. Fails if it is already set; the check and the write are one statement.
pub fn acquire_run_lock(conn: &Connection) -> Result<()> {
    let n = conn.execute(
        "UPDATE run_state SET running = 1, pid = ?1, started_at = ?2 WHERE id = 1 AND running = 0",
        params![std::process::id(), Utc::now().to_rfc3339()],
    )?;
    if n == 0 {
        let (pid, started): (Option<i64>, Option<String>) = conn.query_row(
            "SELECT pid, started_at FROM run_state WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        bail!(
            "another run is in progress (pid {}, started {}); use `unlock` if it is stale",
            pid.map(|p| p.to_string()).unwrap_or_else(|| "?".into()),
            started.unwrap_or_else(|| "?".into())
        );
    }
    Ok(())
}

/// Clear the marker. Returns false when it was not set.
pub fn release_run_lock(conn: &Connection) -> Result<bool> {
    let n = conn.execute(
        "UPDATE run_state SET running = 0, pid = NULL, started_at = NULL WHERE id = 1 AND running = 1",
        [],
    )?;
    Ok(n > 0)
}

/// Holds the run marker; clears it when dropped.
pub struct RunGuard<'a> {
    conn: &'a Connection,
}

impl<'a> RunGuard<'a> {
    pub fn acquire(conn: &'a Connection) -> Result<Self> {
        acquire_run_lock(conn)?;
        Ok(Self { conn })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = release_run_lock(self.conn) {
            log::error!("could not clear run marker: {}", e);
        }
    }
}
