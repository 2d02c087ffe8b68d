//! Remote collaborators: the traits the pipeline and resolver depend on, and their HTTP clients.
//!
//! Clients are explicitly constructed and passed in (usually as `Arc<dyn Trait>`), so tests
//! substitute in-memory fakes. Every call is one complete request/response exchange; clients
//! hold no mutable state between calls and are safe to share across worker threads.

pub mod backoffice;
pub mod drive;
pub mod http;
pub mod insightly;
pub mod inventory;
pub mod sheets;

pub use backoffice::BackOfficeClient;
pub use drive::DriveClient;
pub use insightly::InsightlyClient;
pub use inventory::SkuVaultClient;
pub use sheets::SheetsClient;

use chrono::{DateTime, Utc};

use crate::engine::stats::RunReport;
use crate::error::{OracleError, RemoteError};
use crate::types::{InventoryItem, MarkKind, OpportunityState, PoReply, StatusMark};

/// Which children a listing returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MimeFilter {
    FoldersOnly,
    NonFolders,
}

/// One child as returned by the storage API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One page of a listing; `next_page_token` is `None` on the last page.
#[derive(Clone, Debug, Default)]
pub struct ChildPage {
    pub files: Vec<RemoteFile>,
    pub next_page_token: Option<String>,
}

/// Cloud file hierarchy (Drive).
pub trait RemoteStore: Send + Sync {
    fn list_children(
        &self,
        parent_id: &str,
        filter: MimeFilter,
        page_token: Option<&str>,
    ) -> Result<ChildPage, RemoteError>;

    /// Copy `template_id` into `dest_folder_id` as `new_name`. Returns the new file id.
    fn copy_file(
        &self,
        template_id: &str,
        dest_folder_id: &str,
        new_name: &str,
    ) -> Result<String, RemoteError>;

    fn move_file(&self, file_id: &str, from_parent: &str, to_parent: &str)
    -> Result<bool, RemoteError>;

    fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, RemoteError>;
}

/// Follow continuation tokens until the listing is exhausted.
pub fn list_all_children(
    store: &dyn RemoteStore,
    parent_id: &str,
    filter: MimeFilter,
) -> Result<Vec<RemoteFile>, RemoteError> {
    let mut files = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = store.list_children(parent_id, filter, token.as_deref())?;
        files.extend(page.files);
        match page.next_page_token {
            Some(next) if !next.is_empty() => {
                log::debug!("{}: next page token found", parent_id);
                token = Some(next);
            }
            _ => break,
        }
    }
    Ok(files)
}

/// Rectangular cell values, formatted as the sheet displays them.
pub type Rows = Vec<Vec<String>>;

/// How the spreadsheet backend interprets written values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueInput {
    Raw,
    UserEntered,
}

impl ValueInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInput::Raw => "RAW",
            ValueInput::UserEntered => "USER_ENTERED",
        }
    }
}

/// Spreadsheet backend (Sheets).
pub trait SheetClient: Send + Sync {
    fn get_range(&self, sheet_id: &str, range: &str) -> Result<Rows, RemoteError>;

    fn update_range(
        &self,
        sheet_id: &str,
        range: &str,
        values: &Rows,
        mode: ValueInput,
    ) -> Result<(), RemoteError>;

    fn get_title(&self, sheet_id: &str) -> Result<String, RemoteError>;
}

/// CRM lookup of an opportunity's state.
pub trait StatusOracle {
    fn opportunity_state(&self, opportunity_id: &str) -> Result<OpportunityState, OracleError>;
}

/// Keyed record store of Suspended/Forgotten marks (sheet id -> reason + review flag).
pub trait StatusStore {
    fn lookup(&self, sheet_id: &str) -> anyhow::Result<Option<StatusMark>>;

    /// Record `kind` for `sheet_id`. Returns false when an identical mark is already stored.
    fn mark(&self, sheet_id: &str, title: &str, kind: MarkKind) -> anyhow::Result<bool>;
}

/// Inventory system accepting per-SKU costs. Callers chunk; one call is one request.
pub trait InventorySink {
    fn update_products(&self, items: &[InventoryItem]) -> Result<(), RemoteError>;
}

/// Back-office upload that turns a cost sheet into a purchase order. One call is one request.
pub trait PurchaseOrderSink {
    fn upload_cost_sheet(&self, sheet_url: &str) -> Result<PoReply, RemoteError>;
}

/// End-of-run summary endpoint.
pub trait ReportSink {
    fn send_report(&self, report: &RunReport) -> Result<(), RemoteError>;
}
