//! Command handlers for run, submit, export, review and unlock

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Utc};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::db_ops::{
    RunGuard, SqliteStatusStore, load_processed_folders, mark_reviewed, open_db, release_run_lock,
};
use crate::engine::export::{collect_export, write_csv};
use crate::engine::retry::ThreadSleeper;
use crate::engine::run::{SweepOptions, SweepServices, find_folder, sweep, wins_folder_name};
use crate::engine::stats::{print_summary, send_report};
use crate::engine::purchase_order::submit_purchase_order;
use crate::engine::submission::{sheet_id_from_url, submit_cost_sheet};
use crate::remote::{
    BackOfficeClient, DriveClient, InsightlyClient, PurchaseOrderSink, RemoteStore, SheetsClient,
    SkuVaultClient, StatusStore,
};
use crate::types::SubmissionMode;
use crate::utils::{PackagePaths, Secrets, Settings, StatusBackend, load_settings, setup_logging};

/// Setup logging and load settings with command-line overrides applied.
fn setup_operation(cli: &Cli) -> Result<Settings> {
    setup_logging(cli.verbose);
    let mut settings = load_settings(&cli.config_path(), cli.config.is_some())?;
    cli.apply_to(&mut settings);
    log::debug!("{:#?}", settings);
    Ok(settings)
}

/// Dispatch the parsed command line.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let settings = setup_operation(cli)?;
    let secrets = Secrets::from_env();
    match &cli.command {
        Commands::Run(args) => handle_sweep(&settings, &secrets, !args.no_progress),
        Commands::Submit { sheets } => handle_submit(&settings, &secrets, sheets),
        Commands::Export { out, folder } => {
            handle_export(&settings, &secrets, out.as_deref(), folder.as_deref())
        }
        Commands::Review { sheet_id } => handle_review(&settings, sheet_id),
        Commands::Unlock => handle_unlock(&settings),
    }
}

/// Clear the run marker and exit 130 on Ctrl+C.
fn install_interrupt_handler(db_path: PathBuf) -> Result<()> {
    ctrlc::set_handler(move || {
        log::warn!("interrupted; clearing run marker");
        match open_db(&db_path).and_then(|conn| release_run_lock(&conn)) {
            Ok(_) => {}
            Err(e) => log::error!("could not clear run marker: {:#}", e),
        }
        std::process::exit(130);
    })
    .context("set Ctrl+C handler")
}

fn handle_sweep(settings: &Settings, secrets: &Secrets, progress: bool) -> Result<()> {
    settings.require_drive()?;
    let token = secrets.google_access_token()?;
    let oracle = InsightlyClient::new(secrets.insightly_api_key()?);
    let inventory = SkuVaultClient::new(secrets.user_token()?, secrets.tenant_token()?);

    let db_path = settings.db_path();
    let conn = open_db(&db_path)?;
    let _guard = RunGuard::acquire(&conn)?;
    install_interrupt_handler(db_path.clone())?;

    let status: Box<dyn StatusStore> = match settings.status.backend {
        StatusBackend::Local => Box::new(SqliteStatusStore::new(open_db(&db_path)?)),
        StatusBackend::Remote => Box::new(BackOfficeClient::new(secrets.base_url()?)),
    };
    let purchase_orders = match settings.run.submission {
        SubmissionMode::Inventory => None,
        SubmissionMode::PurchaseOrder => Some(BackOfficeClient::new(secrets.base_url()?)),
    };
    let store: Arc<dyn RemoteStore> = Arc::new(DriveClient::new(token));
    let sheets = SheetsClient::new(token);
    let sleeper = ThreadSleeper;
    let services = SweepServices {
        store,
        sheets: &sheets,
        oracle: &oracle,
        status: status.as_ref(),
        inventory: &inventory,
        purchase_orders: purchase_orders.as_ref().map(|c| c as &dyn PurchaseOrderSink),
        sleeper: &sleeper,
    };
    let opts = SweepOptions {
        root_folder_id: settings.drive.root_folder_id.clone(),
        procurement_folder_id: settings.drive.procurement_folder_id.clone(),
        template_id: settings.drive.template_id.clone(),
        workers: settings.run.workers,
        inter_item_delay: settings.inter_item_delay(),
        staleness_days: settings.run.staleness_days,
        retry: settings.retry.policy(),
        submission: settings.run.submission,
        show_progress: progress && std::io::stderr().is_terminal(),
    };

    let start = Utc::now();
    let started = Instant::now();
    let stats = sweep(&services, &opts, &conn)?;
    let report = stats.into_report(start, Utc::now(), started.elapsed());
    print_summary(&report);

    match secrets.base_url() {
        Ok(base) => {
            send_report(&BackOfficeClient::new(base), &report);
        }
        Err(e) => log::warn!("run statistics not sent: {:#}", e),
    }
    Ok(())
}

fn handle_submit(settings: &Settings, secrets: &Secrets, inputs: &[String]) -> Result<()> {
    let retry = settings.retry.policy();
    let sleeper = ThreadSleeper;
    let submit: Box<dyn Fn(&str) -> Result<String>> = match settings.run.submission {
        SubmissionMode::Inventory => {
            let sheets = SheetsClient::new(secrets.google_access_token()?);
            let inventory = SkuVaultClient::new(secrets.user_token()?, secrets.tenant_token()?);
            Box::new(move |id: &str| {
                let n = submit_cost_sheet(&sheets, &inventory, &retry, &sleeper, id)?;
                Ok(format!("{n} items submitted"))
            })
        }
        SubmissionMode::PurchaseOrder => {
            let back_office = BackOfficeClient::new(secrets.base_url()?);
            Box::new(move |id: &str| {
                let mut calls = 0;
                let outcome = submit_purchase_order(&back_office, &retry, &sleeper, id, &mut calls)?;
                Ok(format!("{outcome:?} after {calls} call(s)"))
            })
        }
    };

    let mut failed = 0;
    for input in inputs {
        let Some(id) = sheet_id_from_url(input) else {
            log::error!("{:?}: no sheet id found", input);
            failed += 1;
            continue;
        };
        match submit(id) {
            Ok(done) => log::info!("{}: {}", id, done),
            Err(e) => {
                log::error!("{}: {:#}", id, e);
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} cost sheets failed", failed, inputs.len());
    }
    Ok(())
}

fn handle_export(
    settings: &Settings,
    secrets: &Secrets,
    out: Option<&Path>,
    folder: Option<&str>,
) -> Result<()> {
    let token = secrets.google_access_token()?;
    let store: Arc<dyn RemoteStore> = Arc::new(DriveClient::new(token));
    let sheets = SheetsClient::new(token);

    let folder_id = match folder {
        Some(id) => id.to_string(),
        None => {
            let wins = wins_folder_name(Utc::now().year());
            find_folder(store.as_ref(), &settings.drive.root_folder_id, &wins)?
                .with_context(|| format!("folder {wins:?} not found; pass --folder"))?
        }
    };

    let conn = open_db(&settings.db_path())?;
    let processed = load_processed_folders(&conn)?;
    let rows = collect_export(
        store,
        &sheets,
        &settings.retry.policy(),
        &ThreadSleeper,
        &folder_id,
        &processed,
        settings.run.workers,
    )?;

    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(PackagePaths::get().export_filename()));
    let file = std::fs::File::create(&out).with_context(|| format!("create {}", out.display()))?;
    write_csv(file, &rows)?;
    log::info!("{} rows written to {}", rows.len(), out.display());
    Ok(())
}

fn handle_review(settings: &Settings, sheet_id: &str) -> Result<()> {
    if settings.status.backend == StatusBackend::Remote {
        bail!("marks are kept by the back office; review them there");
    }
    let conn = open_db(&settings.db_path())?;
    if mark_reviewed(&conn, sheet_id)? {
        log::info!("{} marked as reviewed", sheet_id);
    } else {
        log::warn!("no mark stored for {}", sheet_id);
    }
    Ok(())
}

fn handle_unlock(settings: &Settings) -> Result<()> {
    let conn = open_db(&settings.db_path())?;
    if release_run_lock(&conn)? {
        log::info!("run marker cleared");
    } else {
        log::info!("no run in progress");
    }
    Ok(())
}
