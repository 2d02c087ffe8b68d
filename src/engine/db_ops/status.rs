//! Status marks stored in the local `sheet_status` table.

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::Mutex;

use crate::remote::StatusStore;
use crate::types::{MarkKind, StatusMark};

fn lookup_mark(conn: &Connection, sheet_id: &str) -> Result<Option<StatusMark>> {
    let mark = conn
        .query_row(
            "SELECT sheet_id, title, reason, is_reviewed FROM sheet_status WHERE sheet_id = ?1",
            params![sheet_id],
            |row| {
                Ok(StatusMark {
                    sheet_id: row.get(0)?,
                    title: row.get(1)?,
                    reason: row.get(2)?,
                    is_reviewed: row.get::<_, i64>(3)? != 0,
                })
            },
        )
        .optional()?;
    Ok(mark)
}

/// Set the reviewed flag on a stored mark. Returns false when no mark exists for `sheet_id`.
pub fn mark_reviewed(conn: &Connection, sheet_id: &str) -> Result<bool> {
    let n = conn.execute(
        "UPDATE sheet_status SET is_reviewed = 1 WHERE sheet_id = ?1",
        params![sheet_id],
    )?;
    Ok(n > 0)
}

pub struct SqliteStatusStore {
    conn: Mutex<Connection>,
}

impl SqliteStatusStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("status store mutex poisoned"))?;
        f(&conn)
    }

    pub fn into_inner(self) -> Result<Connection> {
        self.conn
            .into_inner()
            .map_err(|_| anyhow!("status store mutex poisoned"))
    }
}

impl StatusStore for SqliteStatusStore {
    fn lookup(&self, sheet_id: &str) -> Result<Option<StatusMark>> {
        self.with_conn(|conn| lookup_mark(conn, sheet_id))
    }

    /// Re-marking with the same unreviewed reason is a no-op. A new reason, or a mark that was
    /// reviewed since, replaces the stored row and clears the reviewed flag.
    fn mark(&self, sheet_id: &str, title: &str, kind: MarkKind) -> Result<bool> {
        self.with_conn(|conn| {
            if let Some(existing) = lookup_mark(conn, sheet_id)?
                && existing.reason == kind.reason()
                && !existing.is_reviewed
            {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO sheet_status (sheet_id, title, reason, resolution, is_reviewed, marked_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)
                 ON CONFLICT(sheet_id) DO UPDATE SET
                    title = excluded.title,
                    reason = excluded.reason,
                    resolution = excluded.resolution,
                    is_reviewed = 0,
                    marked_at = excluded.marked_at",
                params![
                    sheet_id,
                    title,
                    kind.reason(),
                    kind.resolution(),
                    Utc::now().to_rfc3339()
                ],
            )
            .with_context(|| format!("store mark for {sheet_id}"))?;
            Ok(true)
        })
    }
}
