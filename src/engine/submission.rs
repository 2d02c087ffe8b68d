//! Submit a cost sheet's priced items to the inventory system in fixed-size chunks.

use anyhow::{Context, Result};

use crate::remote::{InventorySink, SheetClient};
use crate::types::InventoryItem;

use super::cost_sheet::{OFFER_TEMPLATE_RANGE, parse_cost_sheet};
use super::retry::{RetryPolicy, Sleeper, with_retry};

/// Most items the inventory API accepts per call.
pub const SUBMISSION_CHUNK: usize = 100;

/// Split `items` into chunks of at most `size`, preserving input order.
pub fn chunk_items(items: &[InventoryItem], size: usize) -> Vec<&[InventoryItem]> {
    items.chunks(size.max(1)).collect()
}

/// Send every item, one request per chunk. Returns the number of items sent.
pub fn submit_items(sink: &dyn InventorySink, items: &[InventoryItem]) -> Result<usize> {
    let chunks = chunk_items(items, SUBMISSION_CHUNK);
    for (i, chunk) in chunks.iter().enumerate() {
        sink.update_products(chunk)
            .with_context(|| format!("submit chunk {} of {}", i + 1, chunks.len()))?;
        log::debug!("chunk {}/{} sent ({} items)", i + 1, chunks.len(), chunk.len());
    }
    Ok(items.len())
}

/// Read a cost sheet, parse its rows, and submit the priced items. Returns the item count.
pub fn submit_cost_sheet(
    sheets: &dyn SheetClient,
    sink: &dyn InventorySink,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
    sheet_id: &str,
) -> Result<usize> {
    let values = with_retry(retry, sleeper, || {
        sheets.get_range(sheet_id, OFFER_TEMPLATE_RANGE)
    })
    .with_context(|| format!("read cost sheet {sheet_id}"))?;
    let parsed = parse_cost_sheet(&values);
    if parsed.rows.is_empty() {
        log::warn!("{}: no priced rows found", sheet_id);
        return Ok(0);
    }
    let items = parsed.items();
    log::info!("sending {} items to inventory", items.len());
    submit_items(sink, &items)
}

/// Sheet id from a sheet URL (`.../d/<id>/edit...`), or the input itself when it is already an id.
/// `None` when no id is left.
pub fn sheet_id_from_url(input: &str) -> Option<&str> {
    let input = input.trim();
    let id = match input.split_once("/d/") {
        Some((_, rest)) => rest.split(['/', '?', '#']).next().unwrap_or(rest),
        None => input,
    };
    (!id.is_empty()).then_some(id)
}
