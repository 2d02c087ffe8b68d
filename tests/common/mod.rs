//! In-memory fakes for the remote collaborator traits.
#![allow(dead_code)]

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use costsweep::error::{OracleError, RemoteError};
use costsweep::remote::{
    ChildPage, InventorySink, MimeFilter, PurchaseOrderSink, RemoteFile, RemoteStore, Rows,
    SheetClient, StatusOracle, ValueInput,
};
use costsweep::engine::retry::Sleeper;
use costsweep::{InventoryItem, OpportunityState, PoReply};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn file(id: &str, name: &str, age_days: i64) -> RemoteFile {
    RemoteFile {
        id: id.to_string(),
        name: name.to_string(),
        created_at: days_ago(age_days),
    }
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - ChronoDuration::days(days) - ChronoDuration::hours(1)
}

pub fn rows(values: &[&[&str]]) -> Rows {
    values
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

// --- Drive ---

#[derive(Default)]
pub struct FakeStore {
    /// parent id -> pages of non-folder children
    pub files: HashMap<String, Vec<Vec<RemoteFile>>>,
    /// parent id -> sub-folders (single page)
    pub folders: Mutex<HashMap<String, Vec<RemoteFile>>>,
    pub failing: Vec<String>,
    pub list_calls: AtomicUsize,
    pub moves: Mutex<Vec<(String, String, String)>>,
    pub copies: Mutex<Vec<(String, String, String)>>,
    pub created: Mutex<Vec<(String, String)>>,
}

impl FakeStore {
    pub fn with_files(mut self, parent: &str, pages: Vec<Vec<RemoteFile>>) -> Self {
        self.files.insert(parent.to_string(), pages);
        self
    }

    pub fn with_folders(self, parent: &str, folders: Vec<RemoteFile>) -> Self {
        if let Ok(mut map) = self.folders.lock() {
            map.insert(parent.to_string(), folders);
        }
        self
    }

    pub fn failing_on(mut self, parent: &str) -> Self {
        self.failing.push(parent.to_string());
        self
    }

    pub fn moves(&self) -> Vec<(String, String, String)> {
        self.moves.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }
}

impl RemoteStore for FakeStore {
    fn list_children(
        &self,
        parent_id: &str,
        filter: MimeFilter,
        page_token: Option<&str>,
    ) -> Result<ChildPage, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|f| f == parent_id) {
            return Err(RemoteError::from_status("drive", 403, "forbidden".into()));
        }
        if filter == MimeFilter::FoldersOnly {
            let folders = self.folders.lock().unwrap();
            return Ok(ChildPage {
                files: folders.get(parent_id).cloned().unwrap_or_default(),
                next_page_token: None,
            });
        }
        let pages = self.files.get(parent_id).cloned().unwrap_or_default();
        let page: usize = page_token.map(|t| t.parse().unwrap()).unwrap_or(0);
        let files = pages.get(page).cloned().unwrap_or_default();
        let next_page_token = (page + 1 < pages.len()).then(|| (page + 1).to_string());
        Ok(ChildPage {
            files,
            next_page_token,
        })
    }

    fn copy_file(
        &self,
        template_id: &str,
        dest_folder_id: &str,
        new_name: &str,
    ) -> Result<String, RemoteError> {
        let mut copies = self.copies.lock().unwrap();
        copies.push((
            template_id.to_string(),
            dest_folder_id.to_string(),
            new_name.to_string(),
        ));
        Ok(format!("copy-{}", copies.len()))
    }

    fn move_file(
        &self,
        file_id: &str,
        from_parent: &str,
        to_parent: &str,
    ) -> Result<bool, RemoteError> {
        self.moves.lock().unwrap().push((
            file_id.to_string(),
            from_parent.to_string(),
            to_parent.to_string(),
        ));
        Ok(true)
    }

    fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, RemoteError> {
        let mut created = self.created.lock().unwrap();
        created.push((name.to_string(), parent_id.to_string()));
        let id = format!("new-folder-{}", created.len());
        self.folders
            .lock()
            .unwrap()
            .entry(parent_id.to_string())
            .or_default()
            .push(RemoteFile {
                id: id.clone(),
                name: name.to_string(),
                created_at: Utc::now(),
            });
        Ok(id)
    }
}

// --- Sheets ---

#[derive(Default)]
pub struct FakeSheets {
    pub ranges: HashMap<(String, String), Rows>,
    pub titles: HashMap<String, String>,
    /// HTTP statuses returned (in order) by `get_range` before it succeeds.
    pub read_failures: Mutex<VecDeque<u16>>,
    pub reads: AtomicUsize,
    pub updates: Mutex<Vec<(String, String, Rows, ValueInput)>>,
}

impl FakeSheets {
    pub fn with_range(mut self, sheet: &str, range: &str, values: Rows) -> Self {
        self.ranges
            .insert((sheet.to_string(), range.to_string()), values);
        self
    }

    pub fn with_title(mut self, sheet: &str, title: &str) -> Self {
        self.titles.insert(sheet.to_string(), title.to_string());
        self
    }

    pub fn failing_reads(self, statuses: &[u16]) -> Self {
        self.read_failures.lock().unwrap().extend(statuses);
        self
    }

    pub fn updates(&self) -> Vec<(String, String, Rows, ValueInput)> {
        self.updates.lock().unwrap().clone()
    }
}

impl SheetClient for FakeSheets {
    fn get_range(&self, sheet_id: &str, range: &str) -> Result<Rows, RemoteError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.read_failures.lock().unwrap().pop_front() {
            return Err(RemoteError::from_status("sheets", status, String::new()));
        }
        Ok(self
            .ranges
            .get(&(sheet_id.to_string(), range.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn update_range(
        &self,
        sheet_id: &str,
        range: &str,
        values: &Rows,
        mode: ValueInput,
    ) -> Result<(), RemoteError> {
        self.updates.lock().unwrap().push((
            sheet_id.to_string(),
            range.to_string(),
            values.clone(),
            mode,
        ));
        Ok(())
    }

    fn get_title(&self, sheet_id: &str) -> Result<String, RemoteError> {
        self.titles
            .get(sheet_id)
            .cloned()
            .ok_or(RemoteError::NotFound { service: "sheets" })
    }
}

// --- CRM ---

#[derive(Default)]
pub struct FakeOracle {
    pub states: HashMap<String, OpportunityState>,
    pub calls: AtomicUsize,
}

impl FakeOracle {
    pub fn with_state(mut self, id: &str, state: OpportunityState) -> Self {
        self.states.insert(id.to_string(), state);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl StatusOracle for FakeOracle {
    fn opportunity_state(&self, opportunity_id: &str) -> Result<OpportunityState, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.states
            .get(opportunity_id)
            .copied()
            .ok_or_else(|| OracleError::UnknownOpportunity(opportunity_id.to_string()))
    }
}

// --- Inventory ---

#[derive(Default)]
pub struct FakeInventory {
    pub chunks: Mutex<Vec<Vec<InventoryItem>>>,
}

impl FakeInventory {
    pub fn chunks(&self) -> Vec<Vec<InventoryItem>> {
        self.chunks.lock().unwrap().clone()
    }
}

impl InventorySink for FakeInventory {
    fn update_products(&self, items: &[InventoryItem]) -> Result<(), RemoteError> {
        self.chunks.lock().unwrap().push(items.to_vec());
        Ok(())
    }
}

// --- Purchase orders ---

/// Replies with the scripted messages in order, then with `PO Created Successfully`.
#[derive(Default)]
pub struct FakePurchaseOrders {
    pub replies: Mutex<VecDeque<PoReply>>,
    pub urls: Mutex<Vec<String>>,
}

impl FakePurchaseOrders {
    pub fn replying(replies: &[(bool, &str)]) -> Self {
        let fake = Self::default();
        fake.replies.lock().unwrap().extend(replies.iter().map(|(error, message)| PoReply {
            error: *error,
            message: message.to_string(),
        }));
        fake
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl PurchaseOrderSink for FakePurchaseOrders {
    fn upload_cost_sheet(&self, sheet_url: &str) -> Result<PoReply, RemoteError> {
        self.urls.lock().unwrap().push(sheet_url.to_string());
        Ok(self.replies.lock().unwrap().pop_front().unwrap_or_else(|| PoReply {
            error: false,
            message: "PO Created Successfully".to_string(),
        }))
    }
}

// --- Sleep ---

#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<(Duration, bool)>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().iter().map(|(d, _)| *d).collect()
    }

    pub fn total(&self) -> Duration {
        self.delays().into_iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration, rate_limited: bool) {
        self.sleeps.lock().unwrap().push((delay, rate_limited));
    }
}
