//! Pool context: channels and shared state handed to the scan workers.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::types::{FolderJob, FolderScanResult};

/// Sizing for one pool start.
#[derive(Clone, Copy, Debug)]
pub struct PoolTuning {
    pub worker_count: usize,
    /// Job queue capacity. The result queue gets the same capacity, so a caller that submits at
    /// most this many jobs can close the sink and drain afterwards without deadlocking.
    pub job_capacity: usize,
}

impl PoolTuning {
    pub fn new(worker_count: usize, job_capacity: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            job_capacity: job_capacity.max(1),
        }
    }
}

/// Shared state every worker sees: first fatal error and the stop flag it raises.
#[derive(Clone, Default)]
pub struct PoolContext {
    pub first_error: Arc<Mutex<Option<String>>>,
    pub abort: Arc<AtomicBool>,
}

/// Channels for the pool. Workers get `job_rx` and `result_tx`; the caller keeps the other ends.
pub struct PoolChannels {
    pub job_tx: Sender<FolderJob>,
    pub job_rx: Receiver<FolderJob>,
    pub result_tx: Sender<FolderScanResult>,
    pub result_rx: Receiver<FolderScanResult>,
    pub ctx: PoolContext,
}

pub fn create_pool_channels(tuning: &PoolTuning) -> PoolChannels {
    let (job_tx, job_rx) = bounded::<FolderJob>(tuning.job_capacity);
    let (result_tx, result_rx) = bounded::<FolderScanResult>(tuning.job_capacity);
    PoolChannels {
        job_tx,
        job_rx,
        result_tx,
        result_rx,
        ctx: PoolContext::default(),
    }
}

/// Handles returned by [`start_pool`](super::start_pool).
///
/// Drop (or [`PoolHandles::close_jobs`]) `job_tx` once every job is submitted; that is the only
/// termination signal. Drain `result_rx` before or while waiting on `completion`.
pub struct PoolHandles {
    pub job_tx: Sender<FolderJob>,
    pub result_rx: Receiver<FolderScanResult>,
    pub completion: Completion,
}

impl PoolHandles {
    /// Submit one job. Fails only when every worker has already exited.
    pub fn submit(&self, job: FolderJob) -> anyhow::Result<()> {
        self.job_tx
            .send(job)
            .map_err(|e| anyhow::anyhow!("no scan workers left to take job {}", e.0))
    }

    /// Close the job sink; workers exit after finishing their current job.
    pub fn close_jobs(self) -> (Receiver<FolderScanResult>, Completion) {
        drop(self.job_tx);
        (self.result_rx, self.completion)
    }
}

/// What the completion barrier reports once every worker has returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSummary {
    pub workers: usize,
    pub jobs_completed: usize,
}

/// Barrier over the worker threads. Each worker returns the number of jobs it completed.
pub struct Completion {
    pub(crate) worker_handles: Vec<JoinHandle<usize>>,
    pub(crate) ctx: PoolContext,
}
