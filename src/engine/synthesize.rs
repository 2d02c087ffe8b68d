//! Cost-sheet synthesis from a pricing sheet.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::remote::{RemoteStore, Rows, SheetClient, ValueInput};
use crate::types::SheetRef;

use super::retry::{RetryPolicy, Sleeper, with_retry};

/// Data copied from the pricing sheet's offer tab.
pub const PRICING_DATA_RANGE: &str = "Final Offer!A2:D";
/// Where the copied data lands in the template.
pub const COST_DATA_RANGE: &str = "Offer Template!A2:D";
/// Summary cell receiving the accepted-offer amount.
pub const COST_SUMMARY_CELL: &str = "Offer Template!S3";

/// `"<title> - Cost Sheet - <YYYY-MM-DD>"`.
pub fn cost_sheet_name(title: &str, today: NaiveDate) -> String {
    format!("{} - Cost Sheet - {}", title, today.format("%Y-%m-%d"))
}

pub struct CostSheetSynthesizer<'a> {
    pub sheets: &'a dyn SheetClient,
    pub store: &'a dyn RemoteStore,
    pub retry: &'a RetryPolicy,
    pub sleeper: &'a dyn Sleeper,
    pub template_id: &'a str,
}

impl CostSheetSynthesizer<'_> {
    /// Copy the template into `parent_folder_id`, fill it from `pricing_sheet_id`, write `cost`.
    ///
    /// Any failure propagates and leaves whatever was already created in place.
    pub fn synthesize(
        &self,
        pricing_sheet_id: &str,
        parent_folder_id: &str,
        cost: i64,
        today: NaiveDate,
    ) -> Result<SheetRef> {
        let title = with_retry(self.retry, self.sleeper, || {
            self.sheets.get_title(pricing_sheet_id)
        })
        .with_context(|| format!("read title of pricing sheet {pricing_sheet_id}"))?;

        let data = with_retry(self.retry, self.sleeper, || {
            self.sheets.get_range(pricing_sheet_id, PRICING_DATA_RANGE)
        })
        .with_context(|| format!("read cost data from pricing sheet {pricing_sheet_id}"))?;

        let name = cost_sheet_name(&title, today);
        let new_id = self
            .store
            .copy_file(self.template_id, parent_folder_id, &name)
            .with_context(|| format!("copy cost sheet template into {parent_folder_id}"))?;
        log::info!("created {} ({})", name, new_id);

        with_retry(self.retry, self.sleeper, || {
            self.sheets
                .update_range(&new_id, COST_DATA_RANGE, &data, ValueInput::Raw)
        })
        .with_context(|| format!("write cost data into {new_id}"))?;

        let cost_cell: Rows = vec![vec![cost.to_string()]];
        with_retry(self.retry, self.sleeper, || {
            self.sheets.update_range(
                &new_id,
                COST_SUMMARY_CELL,
                &cost_cell,
                ValueInput::UserEntered,
            )
        })
        .with_context(|| format!("write cost into {new_id}"))?;

        Ok(SheetRef { id: new_id, name })
    }
}
