//! Engine: disposition resolution, synthesis, submission, the run driver and its CLI

pub mod arg_parser;
pub mod cost_sheet;
pub mod currency;
pub mod db_ops;
pub mod export;
pub mod handlers;
pub mod progress;
pub mod purchase_order;
pub mod resolver;
pub mod retry;
pub mod run;
pub mod stats;
pub mod submission;
pub mod synthesize;

// Re-export commonly used items
pub use arg_parser::{Cli, Commands, RunArgs};
pub use currency::{parse_currency, parse_offer_cell};
pub use db_ops::{SqliteStatusStore, open_db, open_db_in_memory};
pub use handlers::handle_run;
pub use resolver::{Destinations, FolderResolver, Outcome, resolve};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper, with_retry};
pub use run::{SweepOptions, SweepServices, sweep};
pub use stats::{RunReport, RunStatistics};
pub use synthesize::CostSheetSynthesizer;
