//! Public and internal types for the costsweep pipeline and resolver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque folder identifier submitted to the worker pool. Consumed exactly once by one worker.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FolderJob(pub String);

impl FolderJob {
    pub fn new(folder_id: impl Into<String>) -> Self {
        Self(folder_id.into())
    }

    pub fn folder_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A child file inside a folder, as observed by a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// One worker's view of one folder: its non-folder children in listing order plus the folder age.
///
/// `age_days` is whole days from the earliest child creation time to the scan time, never negative.
#[derive(Clone, Debug)]
pub struct FolderScanResult {
    pub parent_folder_id: String,
    pub entries: Vec<FileEntry>,
    pub entry_count: usize,
    pub age_days: i64,
}

impl FolderScanResult {
    /// Build a result from entries, computing `entry_count` and `age_days` against `now`.
    pub fn from_entries(
        parent_folder_id: impl Into<String>,
        entries: Vec<FileEntry>,
        now: DateTime<Utc>,
    ) -> Self {
        let age_days = entries
            .iter()
            .map(|e| e.created_at)
            .min()
            .map(|oldest| age_in_days(oldest, now))
            .unwrap_or(0);
        Self {
            parent_folder_id: parent_folder_id.into(),
            entry_count: entries.len(),
            entries,
            age_days,
        }
    }
}

/// Whole days between `created` and `now`, floored and clamped at zero.
pub fn age_in_days(created: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created).num_days().max(0)
}

/// A sheet (id + display name) a disposition refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetRef {
    pub id: String,
    pub name: String,
}

impl From<&FileEntry> for SheetRef {
    fn from(e: &FileEntry) -> Self {
        SheetRef {
            id: e.id.clone(),
            name: e.name.clone(),
        }
    }
}

/// Classification a folder receives for the current run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Folder already holds a cost sheet.
    HasCostSheet(SheetRef),
    /// Folder holds exactly one pricing sheet and no cost sheet.
    NeedsSynthesis(SheetRef),
    NoActionableSheet,
    Suspended,
    Forgotten,
    Won,
    Lost,
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::HasCostSheet(_) => "has-cost-sheet",
            Disposition::NeedsSynthesis(_) => "needs-synthesis",
            Disposition::NoActionableSheet => "no-actionable-sheet",
            Disposition::Suspended => "suspended",
            Disposition::Forgotten => "forgotten",
            Disposition::Won => "won",
            Disposition::Lost => "lost",
        }
    }
}

/// Opportunity state reported by the CRM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpportunityState {
    Open,
    Won,
    Lost,
    Abandoned,
    Suspended,
    #[serde(other)]
    Unknown,
}

/// Kind of idempotence mark kept in status storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkKind {
    Suspended,
    Forgotten,
}

impl MarkKind {
    const RESOLUTION: &'static str = "Please communicate with the Opportunity Owner to determine if the opportunity is still active. If the opportunity is still active, please update the sheet with the correct cost.";

    /// Reason text stored with the mark; also how a stored mark is matched back to its kind.
    pub fn reason(&self) -> &'static str {
        match self {
            MarkKind::Suspended => {
                "Sheet has not had cost put in for 60 or more days and is suspended in Insightly"
            }
            MarkKind::Forgotten => {
                "Sheet is currently in OPEN status and has not been updated in 60 or more days"
            }
        }
    }

    pub fn resolution(&self) -> &'static str {
        Self::RESOLUTION
    }
}

/// A mark as read back from status storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMark {
    pub sheet_id: String,
    pub title: String,
    pub reason: String,
    pub is_reviewed: bool,
}

impl StatusMark {
    /// True when this mark should short-circuit the oracle for `kind`.
    pub fn blocks(&self, kind: MarkKind) -> bool {
        self.reason == kind.reason() && !self.is_reviewed
    }
}

/// One priced SKU sent to the inventory system.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InventoryItem {
    pub sku: String,
    pub cost: f64,
}

/// How a folder's cost sheet is handed on once it is ready.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// Parse the sheet and push per-SKU costs to the inventory system.
    #[default]
    Inventory,
    /// Hand the sheet URL to the back office, which raises a purchase order.
    PurchaseOrder,
}

/// Back-office reply to a cost-sheet upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PoReply {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub message: String,
}
