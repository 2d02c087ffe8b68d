//! Run statistics: counters gathered by the driver, printed and reported at the end of a run.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::time::Duration;

use crate::remote::ReportSink;
use crate::types::Disposition;

/// Counters and timings accumulated during one run. Not used for control flow.
#[derive(Clone, Debug, Default)]
pub struct RunStatistics {
    pub total_folders: usize,
    pub processed: usize,
    /// Folders skipped without the inter-item countdown.
    pub skipped_without_delay: usize,
    pub sheets_created: usize,
    pub sheets_submitted: usize,
    pub items_submitted: usize,
    /// Purchase orders the back office reported as newly created.
    pub pos_generated: usize,
    /// Cost-sheet upload requests, retries included.
    pub po_calls: usize,
    pub folders_won: usize,
    pub folders_lost: usize,
    pub failures: usize,
    pub rate_limit_waits: usize,
    pub time_sleeping: Duration,
    pub time_waiting_for_offers: Duration,
    pub time_waiting_for_submission: Duration,
}

impl RunStatistics {
    pub fn new(total_folders: usize) -> Self {
        Self {
            total_folders,
            ..Self::default()
        }
    }

    /// Count a settled folder by its disposition.
    pub fn record_disposition(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Won => self.folders_won += 1,
            Disposition::Lost => self.folders_lost += 1,
            _ => {}
        }
    }

    /// Elapsed time not spent sleeping or waiting on remote calls tracked above. The wait
    /// windows exclude retry sleeps, which are already in `time_sleeping`.
    pub fn local_processing(&self, elapsed: Duration) -> Duration {
        elapsed
            .saturating_sub(self.time_sleeping)
            .saturating_sub(self.time_waiting_for_offers)
            .saturating_sub(self.time_waiting_for_submission)
    }

    pub fn into_report(self, start: DateTime<Utc>, end: DateTime<Utc>, elapsed: Duration) -> RunReport {
        RunReport {
            start,
            end,
            completed: true,
            total_folders: self.total_folders,
            processed: self.processed,
            skipped_without_delay: self.skipped_without_delay,
            sheets_created: self.sheets_created,
            sheets_submitted: self.sheets_submitted,
            items_submitted: self.items_submitted,
            pos_generated: self.pos_generated,
            po_calls: self.po_calls,
            folders_won: self.folders_won,
            folders_lost: self.folders_lost,
            failures: self.failures,
            rate_limit_waits: self.rate_limit_waits,
            total_execution_secs: elapsed.as_secs_f64(),
            time_sleeping_secs: self.time_sleeping.as_secs_f64(),
            time_waiting_for_offers_secs: self.time_waiting_for_offers.as_secs_f64(),
            time_waiting_for_submission_secs: self.time_waiting_for_submission.as_secs_f64(),
            local_processing_secs: self.local_processing(elapsed).as_secs_f64(),
        }
    }
}

/// End-of-run record sent to the reporting endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub completed: bool,
    pub total_folders: usize,
    pub processed: usize,
    pub skipped_without_delay: usize,
    pub sheets_created: usize,
    pub sheets_submitted: usize,
    pub items_submitted: usize,
    pub pos_generated: usize,
    pub po_calls: usize,
    pub folders_won: usize,
    pub folders_lost: usize,
    pub failures: usize,
    pub rate_limit_waits: usize,
    pub total_execution_secs: f64,
    pub time_sleeping_secs: f64,
    pub time_waiting_for_offers_secs: f64,
    pub time_waiting_for_submission_secs: f64,
    pub local_processing_secs: f64,
}

fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 { part / total * 100.0 } else { 0.0 }
}

pub fn print_summary(report: &RunReport) {
    let total = report.total_execution_secs;
    let timed = |label: &str, secs: f64| {
        println!(
            "  {:<32} {:>9.1}s  ({:.1}%)",
            label,
            secs,
            share(secs, total)
        );
    };
    println!("{}", "Run summary".cyan().bold());
    println!("  {:<32} {}", "Folders", report.total_folders);
    println!("  {:<32} {}", "Processed", report.processed.to_string().green());
    println!("  {:<32} {}", "Skipped without delay", report.skipped_without_delay);
    println!("  {:<32} {}", "Cost sheets created", report.sheets_created);
    println!("  {:<32} {}", "Cost sheets submitted", report.sheets_submitted);
    println!("  {:<32} {}", "Items submitted", report.items_submitted);
    if report.po_calls > 0 {
        println!("  {:<32} {}", "Purchase orders created", report.pos_generated);
        println!("  {:<32} {}", "Cost sheet uploads", report.po_calls);
    }
    println!("  {:<32} {}", "Folders won", report.folders_won);
    println!("  {:<32} {}", "Folders lost", report.folders_lost);
    if report.failures > 0 {
        println!("  {:<32} {}", "Failures", report.failures.to_string().red());
    }
    println!("  {:<32} {}", "Rate limit waits", report.rate_limit_waits);
    println!("  {:<32} {:>9.1}s", "Total execution time", total);
    timed("Time sleeping", report.time_sleeping_secs);
    timed("Time waiting for offers", report.time_waiting_for_offers_secs);
    timed("Time waiting for submission", report.time_waiting_for_submission_secs);
    timed("Local processing", report.local_processing_secs);
}

/// Send the report. A failure is logged and otherwise ignored.
pub fn send_report(sink: &dyn ReportSink, report: &RunReport) -> bool {
    match sink.send_report(report) {
        Ok(()) => {
            log::info!("run statistics sent");
            true
        }
        Err(e) => {
            log::warn!("could not send run statistics: {}", e);
            false
        }
    }
}
