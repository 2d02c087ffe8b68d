//! Scan pool: bounded job queue of folder ids → workers listing children → bounded result queue.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod scan;

pub use context::{
    Completion, PoolChannels, PoolContext, PoolHandles, PoolSummary, PoolTuning,
    create_pool_channels,
};
pub use error_handler::check_for_first_error;
pub use orchestrator::{scan_folders, start_pool};
pub use scan::{scan_folder, spawn_scan_workers};

/// Worker count when none is configured.
pub const DEFAULT_WORKERS: usize = 10;
