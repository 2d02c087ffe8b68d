//! CSV export of submitted cost sheets: one line per SKU with its PO number and sheet link.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use crate::pipeline::scan_folders;
use crate::remote::{MimeFilter, RemoteStore, Rows, SheetClient, list_all_children};

use super::cost_sheet::data_rows;
use super::retry::{RetryPolicy, Sleeper, with_retry};
use super::run::is_candidate_folder;

/// SKU (J) through cost (P) of the offer template.
pub const EXPORT_RANGE: &str = "Offer Template!J:P";

const SKU_COLUMN: usize = 1;
const COST_COLUMN: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub po_number: String,
    pub sku: String,
    pub cost: String,
    pub link: String,
}

pub fn sheet_link(sheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{sheet_id}/edit")
}

/// Turn one sheet's `Offer Template!J:P` values into export rows. The sheet name is the PO number.
pub fn export_rows(sheet_name: &str, sheet_id: &str, values: &Rows) -> Vec<ExportRow> {
    let link = sheet_link(sheet_id);
    data_rows(values)
        .into_iter()
        .map(|row| ExportRow {
            po_number: sheet_name.to_string(),
            sku: row.get(SKU_COLUMN).cloned().unwrap_or_default(),
            cost: row.get(COST_COLUMN).cloned().unwrap_or_default(),
            link: link.clone(),
        })
        .collect()
}

/// Collect export rows from the cost sheets of processed folders under `folder_id`.
pub fn collect_export(
    store: Arc<dyn RemoteStore>,
    sheets: &dyn SheetClient,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
    folder_id: &str,
    processed: &HashSet<String>,
    workers: usize,
) -> Result<Vec<ExportRow>> {
    let folders = list_all_children(store.as_ref(), folder_id, MimeFilter::FoldersOnly)
        .with_context(|| format!("list folders under {folder_id}"))?;
    let ids: Vec<String> = folders
        .into_iter()
        .filter(|f| is_candidate_folder(&f.name) && processed.contains(&f.name))
        .map(|f| f.id)
        .collect();
    log::info!("{} processed folders to export", ids.len());

    let mut seen = HashSet::new();
    let mut cost_sheets = Vec::new();
    for result in scan_folders(store, &ids, workers)? {
        for entry in result.entries {
            if entry.name.contains("Cost") && seen.insert(entry.id.clone()) {
                log::debug!("cost sheet found: {}", entry.name);
                cost_sheets.push(entry);
            }
        }
    }
    log::info!("{} cost sheets to export", cost_sheets.len());

    let mut rows = Vec::new();
    for sheet in cost_sheets {
        let values = with_retry(retry, sleeper, || sheets.get_range(&sheet.id, EXPORT_RANGE))
            .with_context(|| format!("read {}", sheet.name))?;
        let found = export_rows(&sheet.name, &sheet.id, &values);
        log::info!("{}: {} rows", sheet.name, found.len());
        rows.extend(found);
    }
    Ok(rows)
}

/// Write rows as `po_number,sku,cost,link` CSV.
pub fn write_csv<W: Write>(out: W, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    writer
        .write_record(["po_number", "sku", "cost", "link"])
        .context("write csv header")?;
    for row in rows {
        writer.serialize(row).context("write csv row")?;
    }
    writer.flush().context("flush csv")?;
    Ok(())
}
