//! Costsweep: procurement back-office sweep over cloud folders, spreadsheets and a CRM

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod remote;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

/// Result alias used by the public costsweep API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
