//! Costsweep CLI: sweep procurement folders, submit and export cost sheets.

use anyhow::Result;
use clap::Parser;
use costsweep::engine::arg_parser::Cli;
use costsweep::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
