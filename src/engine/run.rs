//! The sweep: list candidate folders, scan them in parallel, then settle each one in turn.

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Utc};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::scan_folders;
use crate::remote::{
    InventorySink, MimeFilter, PurchaseOrderSink, RemoteFile, RemoteStore, SheetClient,
    StatusOracle, StatusStore, list_all_children,
};
use crate::types::{Disposition, FolderScanResult, SheetRef, SubmissionMode};

use super::db_ops::{add_processed_folder, load_processed_folders};
use super::progress::countdown;
use super::purchase_order::{PoOutcome, submit_purchase_order};
use super::resolver::{Destinations, FolderResolver, Outcome, is_fatal};
use super::retry::{RetryPolicy, Sleeper, TallyingSleeper, time_awake};
use super::stats::RunStatistics;
use super::submission::submit_cost_sheet;

pub const LOSSES_FOLDER_NAME: &str = "Surplus Procurement Lost";

/// `"<year> Surplus Procurement Wins"`.
pub fn wins_folder_name(year: i32) -> String {
    format!("{year} Surplus Procurement Wins")
}

/// Opportunity folders are named with more than two hyphen-separated parts.
pub fn is_candidate_folder(name: &str) -> bool {
    name.split('-').count() > 2
}

/// Id of the sub-folder of `parent_id` named `name`, if any.
pub fn find_folder(store: &dyn RemoteStore, parent_id: &str, name: &str) -> Result<Option<String>> {
    let folders = list_all_children(store, parent_id, MimeFilter::FoldersOnly)
        .with_context(|| format!("list folders under {parent_id}"))?;
    Ok(folders.into_iter().find(|f| f.name == name).map(|f| f.id))
}

/// Id of the sub-folder of `parent_id` named `name`, creating it when absent.
pub fn ensure_folder(store: &dyn RemoteStore, parent_id: &str, name: &str) -> Result<String> {
    if let Some(id) = find_folder(store, parent_id, name)? {
        return Ok(id);
    }
    let id = store
        .create_folder(name, parent_id)
        .with_context(|| format!("create folder {name:?}"))?;
    log::info!("created folder {} ({})", name, id);
    Ok(id)
}

/// Procurement sub-folders worth scanning: candidate names not yet processed.
pub fn candidate_folders(
    store: &dyn RemoteStore,
    procurement_folder_id: &str,
    processed: &HashSet<String>,
) -> Result<Vec<RemoteFile>> {
    let folders = list_all_children(store, procurement_folder_id, MimeFilter::FoldersOnly)
        .with_context(|| format!("list procurement folders under {procurement_folder_id}"))?;
    let total = folders.len();
    let candidates: Vec<RemoteFile> = folders
        .into_iter()
        .filter(|f| is_candidate_folder(&f.name) && !processed.contains(&f.name))
        .collect();
    log::info!(
        "{} folders found, {} to scan ({} already processed or not opportunities)",
        total,
        candidates.len(),
        total - candidates.len()
    );
    Ok(candidates)
}

/// Remote collaborators for one sweep.
pub struct SweepServices<'a> {
    pub store: Arc<dyn RemoteStore>,
    pub sheets: &'a dyn SheetClient,
    pub oracle: &'a dyn StatusOracle,
    pub status: &'a dyn StatusStore,
    pub inventory: &'a dyn InventorySink,
    /// Required when submitting through purchase orders.
    pub purchase_orders: Option<&'a dyn PurchaseOrderSink>,
    pub sleeper: &'a dyn Sleeper,
}

#[derive(Clone, Debug)]
pub struct SweepOptions {
    pub root_folder_id: String,
    pub procurement_folder_id: String,
    pub template_id: String,
    pub workers: usize,
    pub inter_item_delay: Duration,
    pub staleness_days: i64,
    pub retry: RetryPolicy,
    pub submission: SubmissionMode,
    pub show_progress: bool,
}

/// Run one sweep over the procurement folder. Per-folder failures are logged and counted;
/// fatal ones (listing, local state, malformed offers) end the sweep with an error.
pub fn sweep(services: &SweepServices, opts: &SweepOptions, conn: &Connection) -> Result<RunStatistics> {
    if opts.submission == SubmissionMode::PurchaseOrder && services.purchase_orders.is_none() {
        bail!("purchase-order submission needs the back-office client");
    }
    let today = Utc::now().date_naive();
    let store = services.store.as_ref();

    let destinations = Destinations {
        procurement_folder_id: opts.procurement_folder_id.clone(),
        wins_folder_id: ensure_folder(store, &opts.root_folder_id, &wins_folder_name(today.year()))?,
        losses_folder_id: ensure_folder(store, &opts.root_folder_id, LOSSES_FOLDER_NAME)?,
    };

    let processed = load_processed_folders(conn).context("load processed folders")?;
    let folders = candidate_folders(store, &opts.procurement_folder_id, &processed)?;
    let names: HashMap<String, String> = folders
        .iter()
        .map(|f| (f.id.clone(), f.name.clone()))
        .collect();
    let ids: Vec<String> = folders.into_iter().map(|f| f.id).collect();

    let results = scan_folders(Arc::clone(&services.store), &ids, opts.workers)?;
    log::info!("{} folders scanned", results.len());

    let sleeper = TallyingSleeper::new(services.sleeper);
    let resolver = FolderResolver::new(
        services.sheets,
        store,
        services.oracle,
        services.status,
        &opts.retry,
        &sleeper,
        &destinations,
        &opts.template_id,
        opts.staleness_days,
        today,
    );
    let step = Step {
        services,
        opts,
        conn,
        resolver: &resolver,
        sleeper: &sleeper,
    };

    let mut stats = RunStatistics::new(results.len());
    let total = results.len();
    for (i, result) in results.iter().enumerate() {
        let name = names
            .get(&result.parent_folder_id)
            .map(String::as_str)
            .unwrap_or(result.parent_folder_id.as_str());
        log::info!("[{}/{}] {}", i + 1, total, name);

        let delay = match step.process(result, name, &mut stats) {
            Ok(delay) => delay,
            Err(e) if is_fatal(&e) => return Err(e.context(format!("folder {name}"))),
            Err(e) => {
                log::error!("{}: {:#}", name, e);
                stats.failures += 1;
                true
            }
        };
        stats.processed += 1;
        if !delay {
            stats.skipped_without_delay += 1;
        } else if i + 1 < total {
            countdown(&sleeper, opts.inter_item_delay, opts.show_progress);
        }
    }

    let tally = sleeper.tally();
    stats.time_sleeping = tally.total;
    stats.rate_limit_waits = tally.rate_limit_waits;
    stats.time_waiting_for_offers = resolver.offer_wait();
    Ok(stats)
}

struct Step<'s, 'a> {
    services: &'s SweepServices<'a>,
    opts: &'s SweepOptions,
    conn: &'s Connection,
    resolver: &'s FolderResolver<'s>,
    sleeper: &'s dyn Sleeper,
}

impl Step<'_, '_> {
    /// Settle one folder. Returns whether the inter-item countdown should follow.
    fn process(&self, result: &FolderScanResult, name: &str, stats: &mut RunStatistics) -> Result<bool> {
        match self.resolver.settle(result)? {
            Outcome::Ready {
                cost_sheet,
                synthesized,
            } => {
                if synthesized {
                    stats.sheets_created += 1;
                }
                let settled = match self.opts.submission {
                    SubmissionMode::Inventory => self.submit_inventory(&cost_sheet, stats)?,
                    SubmissionMode::PurchaseOrder => self.submit_purchase_order(&cost_sheet, stats)?,
                };
                if settled {
                    self.resolver
                        .move_folder(&result.parent_folder_id, &self.resolver.destinations.wins_folder_id)?;
                    add_processed_folder(self.conn, name)?;
                }
                Ok(true)
            }
            Outcome::Settled { disposition, delay } => {
                log::debug!("{}: {}", name, disposition.label());
                stats.record_disposition(&disposition);
                if matches!(disposition, Disposition::Won | Disposition::Lost) {
                    add_processed_folder(self.conn, name)?;
                }
                Ok(delay)
            }
        }
    }

    /// Push the sheet's priced items to inventory. Returns whether the folder is done.
    fn submit_inventory(&self, cost_sheet: &SheetRef, stats: &mut RunStatistics) -> Result<bool> {
        let (sent, waited) = time_awake(self.sleeper, || {
            submit_cost_sheet(
                self.services.sheets,
                self.services.inventory,
                &self.opts.retry,
                self.sleeper,
                &cost_sheet.id,
            )
        });
        stats.time_waiting_for_submission += waited;
        let sent = sent.with_context(|| format!("submit {}", cost_sheet.name))?;
        if sent == 0 {
            log::warn!("{}: nothing submitted; folder left in place", cost_sheet.name);
            return Ok(false);
        }
        stats.sheets_submitted += 1;
        stats.items_submitted += sent;
        Ok(true)
    }

    /// Upload the sheet for purchase-order creation. Returns whether the folder is done.
    fn submit_purchase_order(&self, cost_sheet: &SheetRef, stats: &mut RunStatistics) -> Result<bool> {
        let Some(sink) = self.services.purchase_orders else {
            bail!("purchase-order submission needs the back-office client");
        };
        let mut calls = 0;
        let (outcome, waited) = time_awake(self.sleeper, || {
            submit_purchase_order(sink, &self.opts.retry, self.sleeper, &cost_sheet.id, &mut calls)
        });
        stats.po_calls += calls;
        stats.time_waiting_for_submission += waited;
        let outcome = outcome.with_context(|| format!("submit {}", cost_sheet.name))?;
        if outcome == PoOutcome::Created {
            stats.pos_generated += 1;
            stats.sheets_submitted += 1;
        }
        Ok(outcome.is_settled())
    }
}
