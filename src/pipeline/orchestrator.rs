use anyhow::Result;
use log::debug;
use std::sync::Arc;

use crate::remote::RemoteStore;
use crate::types::{FolderJob, FolderScanResult};

use super::context::{Completion, PoolHandles, PoolSummary, PoolTuning, create_pool_channels};
use super::error_handler::check_for_first_error;
use super::scan::spawn_scan_workers;

/// Start the scan pool. Returns the job sink, the result source, and the completion barrier.
pub fn start_pool(store: Arc<dyn RemoteStore>, tuning: PoolTuning) -> PoolHandles {
    let channels = create_pool_channels(&tuning);
    let worker_handles = spawn_scan_workers(
        channels.job_rx,
        &channels.result_tx,
        store,
        &channels.ctx,
        tuning.worker_count,
    );

    // Dropping the last sender closes the result queue once every worker has exited.
    drop(channels.result_tx);

    PoolHandles {
        job_tx: channels.job_tx,
        result_rx: channels.result_rx,
        completion: Completion {
            worker_handles,
            ctx: channels.ctx,
        },
    }
}

impl Completion {
    /// Block until every worker has returned. Fails if a worker panicked or a listing failed.
    pub fn wait(self) -> Result<PoolSummary> {
        let workers = self.worker_handles.len();
        let mut jobs_completed = 0;
        for h in self.worker_handles {
            jobs_completed += h
                .join()
                .map_err(|_| anyhow::anyhow!("scan worker panicked"))?;
        }
        check_for_first_error(&self.ctx.first_error)?;
        Ok(PoolSummary {
            workers,
            jobs_completed,
        })
    }
}

/// Scan every folder in `folder_ids` with `worker_count` workers and collect the results.
/// Order of results is unspecified. Any listing failure fails the whole call.
pub fn scan_folders(
    store: Arc<dyn RemoteStore>,
    folder_ids: &[String],
    worker_count: usize,
) -> Result<Vec<FolderScanResult>> {
    let tuning = PoolTuning::new(worker_count, folder_ids.len());
    let handles = start_pool(store, tuning);
    for id in folder_ids {
        if handles.submit(FolderJob::new(id.as_str())).is_err() {
            // Every worker stopped on a fatal listing error; the barrier reports it below.
            break;
        }
    }
    let (result_rx, completion) = handles.close_jobs();
    debug!("job queue closed after {} folders", folder_ids.len());

    let mut results = Vec::with_capacity(folder_ids.len());
    while let Ok(result) = result_rx.recv() {
        results.push(result);
    }
    let summary = completion.wait()?;
    debug!(
        "scan pool done: {} workers, {} folders scanned",
        summary.workers, summary.jobs_completed
    );
    Ok(results)
}
