use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::utils::config::PackagePaths;
use crate::utils::settings::Settings;

/// Procurement cost-sheet sweep: resolve opportunity folders, synthesize and submit cost sheets.
#[derive(Clone, Parser)]
#[command(name = "costsweep")]
#[command(about = "Sweep procurement folders; create, submit and export cost sheets.")]
pub struct Cli {
    /// Settings file. Default: `costsweep.toml` in the current directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Local state database. Default: `[run] db_path`, else `.costsweep` in the current directory.
    #[arg(long, short, global = true)]
    pub db: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Scan the procurement folder and settle every opportunity folder.
    Run(RunArgs),
    /// Submit cost sheets given by URL or id.
    Submit {
        /// Sheet URLs (`.../d/<id>/edit`) or bare ids.
        #[arg(required = true, num_args = 1..)]
        sheets: Vec<String>,
    },
    /// Write a CSV of SKUs and costs from processed folders' cost sheets.
    Export {
        /// Output file. Default: `costsweep_export.csv`.
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Folder to scan. Default: this year's wins folder.
        #[arg(long)]
        folder: Option<String>,
    },
    /// Mark a stored Suspended/Forgotten mark as reviewed.
    Review {
        #[arg(value_name = "SHEET_ID")]
        sheet_id: String,
    },
    /// Clear a stale run marker left by a crashed run.
    Unlock,
}

#[derive(Clone, Args)]
pub struct RunArgs {
    /// Scan workers.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Seconds to wait between folders.
    #[arg(long, short = 's')]
    pub sleep: Option<u64>,

    /// Hide the countdown bar.
    #[arg(long)]
    pub no_progress: bool,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(PackagePaths::get().config_filename()))
    }

    /// Apply options given on the command line over file settings.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(ref db) = self.db {
            settings.run.db_path = Some(db.clone());
        }
        if let Commands::Run(ref args) = self.command {
            if let Some(w) = args.workers {
                settings.run.workers = w;
            }
            if let Some(s) = args.sleep {
                settings.run.sleep_timeout_secs = s;
            }
        }
    }
}
