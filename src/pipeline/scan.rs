use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use crate::error::RemoteError;
use crate::remote::{MimeFilter, RemoteStore, list_all_children};
use crate::types::{FileEntry, FolderJob, FolderScanResult};

use super::context::PoolContext;

/// List the non-folder children of `folder_id` (all pages) and build its scan result.
pub fn scan_folder(
    store: &dyn RemoteStore,
    folder_id: &str,
) -> Result<FolderScanResult, RemoteError> {
    let files = list_all_children(store, folder_id, MimeFilter::NonFolders)?;
    let now = Utc::now();
    let entries: Vec<FileEntry> = files
        .into_iter()
        .map(|f| {
            log::debug!(
                "{}: file {} ({}), created {}",
                folder_id,
                f.name,
                f.id,
                f.created_at
            );
            FileEntry {
                name: f.name,
                id: f.id,
                created_at: f.created_at,
            }
        })
        .collect();
    Ok(FolderScanResult::from_entries(folder_id, entries, now))
}

/// Single scan worker: take jobs until the sink closes, emit one result per job.
/// A listing failure records the first error, raises abort, and stops this worker.
fn scan_worker_loop(
    job_rx: Receiver<FolderJob>,
    result_tx: Sender<FolderScanResult>,
    store: Arc<dyn RemoteStore>,
    ctx: PoolContext,
) -> usize {
    let mut completed = 0_usize;
    while let Ok(job) = job_rx.recv() {
        if ctx.abort.load(Ordering::Relaxed) {
            break;
        }
        match scan_folder(store.as_ref(), job.folder_id()) {
            Ok(result) => {
                if result_tx.send(result).is_err() {
                    break;
                }
                completed += 1;
            }
            Err(err) => {
                let msg = format!("listing folder {} failed: {}", job, err);
                if let Ok(mut slot) = ctx.first_error.lock() {
                    slot.get_or_insert(msg);
                }
                ctx.abort.store(true, Ordering::Relaxed);
                break;
            }
        }
    }
    drop(result_tx);
    completed
}

/// Spawn scan workers. Caller must drop its own `result_tx` afterwards so the result queue
/// closes when the last worker exits.
pub fn spawn_scan_workers(
    job_rx: Receiver<FolderJob>,
    result_tx: &Sender<FolderScanResult>,
    store: Arc<dyn RemoteStore>,
    ctx: &PoolContext,
    worker_count: usize,
) -> Vec<JoinHandle<usize>> {
    (0..worker_count)
        .map(|worker_id| {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let store = Arc::clone(&store);
            let ctx = ctx.clone();
            thread::spawn(move || {
                log::debug!("scan worker {} started", worker_id);
                let completed = scan_worker_loop(job_rx, result_tx, store, ctx);
                log::debug!("scan worker {} finished ({} jobs)", worker_id, completed);
                completed
            })
        })
        .collect()
}
