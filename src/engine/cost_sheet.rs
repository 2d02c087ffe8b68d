//! Parse a cost sheet's offer template rows into priced SKUs.

use std::collections::HashSet;

use crate::remote::Rows;
use crate::types::InventoryItem;

use super::currency::parse_currency;

/// Full item table of a cost sheet.
pub const OFFER_TEMPLATE_RANGE: &str = "Offer Template!A:P";

mod col {
    pub const MANUFACTURER: usize = 0;
    pub const MODEL: usize = 1;
    pub const CONDITION: usize = 3;
    pub const EBAY: usize = 6;
    pub const NOTES: usize = 8;
    pub const AP: usize = 9;
    pub const SKU: usize = 10;
    pub const INVENTORY: usize = 11;
    pub const PARENT_SKU: usize = 14;
    pub const COST: usize = 15;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CostSheetRow {
    pub manufacturer: String,
    pub model: String,
    pub condition: i64,
    /// eBay listing count.
    pub ebay: i64,
    pub notes: String,
    pub ap: bool,
    pub sku: String,
    pub inventory: i64,
    pub parent_sku: String,
    /// Whole dollars; cents are dropped.
    pub cost: i64,
}

impl CostSheetRow {
    pub fn to_item(&self) -> InventoryItem {
        InventoryItem {
            sku: self.sku.clone(),
            cost: self.cost as f64,
        }
    }
}

/// Parsed rows plus the count they should have matched.
#[derive(Debug, Default)]
pub struct ParsedCostSheet {
    pub rows: Vec<CostSheetRow>,
    /// Non-empty data rows before per-row parsing.
    pub expected: usize,
}

impl ParsedCostSheet {
    pub fn items(&self) -> Vec<InventoryItem> {
        self.rows.iter().map(CostSheetRow::to_item).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.rows.len() == self.expected
    }
}

/// Sheets trims trailing empty cells, so short rows read as empty.
fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(|s| s.trim()).unwrap_or("")
}

/// Drop the header row and every row whose first cell is empty.
pub fn data_rows(values: &Rows) -> Vec<&Vec<String>> {
    values
        .iter()
        .skip(1)
        .filter(|row| !cell(row, 0).is_empty())
        .collect()
}

/// Boolean cell as the sheet writes it: `TRUE`/`FALSE`, `true`, `T`, `1`, `0`, ...
fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Some(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_int(row: &[String], i: usize, what: &str) -> Result<i64, String> {
    let s = cell(row, i);
    s.parse::<i64>().map_err(|_| format!("{what} {s:?}"))
}

fn parse_row(row: &[String]) -> Result<CostSheetRow, String> {
    let condition = parse_int(row, col::CONDITION, "condition")?;
    let ebay = parse_int(row, col::EBAY, "ebay")?;
    let ap = parse_flag(cell(row, col::AP)).ok_or_else(|| format!("ap {:?}", cell(row, col::AP)))?;
    let sku = cell(row, col::SKU);
    if sku.is_empty() {
        return Err("missing sku".to_string());
    }
    let inventory = match cell(row, col::INVENTORY) {
        "" => 0,
        inv => inv.parse::<i64>().map_err(|_| format!("inventory {inv:?}"))?,
    };
    let cost = parse_currency(cell(row, col::COST)).map_err(|e| e.to_string())?;
    Ok(CostSheetRow {
        manufacturer: cell(row, col::MANUFACTURER).to_string(),
        model: cell(row, col::MODEL).to_string(),
        condition,
        ebay,
        notes: cell(row, col::NOTES).to_string(),
        ap,
        sku: sku.to_string(),
        inventory,
        parent_sku: cell(row, col::PARENT_SKU).to_string(),
        cost,
    })
}

/// Parse offer template values. Unparsable rows and duplicate SKUs are skipped with a warning;
/// a count mismatch is reported loudly but the parsed rows are still returned.
pub fn parse_cost_sheet(values: &Rows) -> ParsedCostSheet {
    let data = data_rows(values);
    let mut seen: HashSet<String> = HashSet::new();
    let mut rows = Vec::with_capacity(data.len());
    for (i, raw) in data.iter().enumerate() {
        match parse_row(raw) {
            Ok(row) => {
                if !seen.insert(row.sku.clone()) {
                    log::warn!("duplicate sku {}", row.sku);
                    continue;
                }
                rows.push(row);
            }
            Err(why) => log::warn!("skipping row {}: {}", i + 2, why),
        }
    }
    let parsed = ParsedCostSheet {
        rows,
        expected: data.len(),
    };
    if !parsed.is_complete() {
        log::warn!(
            "missing sku values: expected {} rows, parsed {} (likely a duplicate sku in the cost sheet)",
            parsed.expected,
            parsed.rows.len()
        );
    }
    parsed
}
