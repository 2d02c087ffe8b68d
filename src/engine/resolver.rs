//! Disposition resolution: classify a scanned folder, then drive it to a settled outcome.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::cell::Cell;
use std::time::Duration;

use crate::error::{CurrencyError, OracleError};
use crate::remote::{RemoteStore, SheetClient, StatusOracle, StatusStore};
use crate::types::{Disposition, FolderScanResult, MarkKind, OpportunityState, SheetRef};

use super::currency::parse_offer_cell;
use super::retry::{RetryPolicy, Sleeper, time_awake, with_retry};
use super::synthesize::CostSheetSynthesizer;

/// Substring that marks a file as a cost sheet.
pub const COST_SHEET_MARKER: &str = "Cost Sheet";
/// Accepted-offer cell on a pricing sheet.
pub const ACCEPTED_OFFER_CELL: &str = "Final Offer!T3";

/// Pricing sheets are named `<a>-<b>-<opportunity id>`: exactly three hyphen segments.
pub fn is_pricing_sheet_name(name: &str) -> bool {
    name.split('-').count() == 3
}

/// Opportunity id encoded in a pricing sheet name (third hyphen segment, trimmed).
pub fn opportunity_id(pricing_sheet_name: &str) -> Option<&str> {
    pricing_sheet_name
        .split('-')
        .nth(2)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Classify a folder from its listing alone.
///
/// 1. First child (scan order) whose name contains "Cost Sheet" → `HasCostSheet`.
/// 2. Else exactly one child with a three-segment hyphenated name → `NeedsSynthesis`.
/// 3. Else `NoActionableSheet`.
pub fn resolve(result: &FolderScanResult) -> Disposition {
    if let Some(cost_sheet) = result
        .entries
        .iter()
        .find(|e| e.name.contains(COST_SHEET_MARKER))
    {
        return Disposition::HasCostSheet(cost_sheet.into());
    }
    let mut pricing = result
        .entries
        .iter()
        .filter(|e| is_pricing_sheet_name(&e.name));
    match (pricing.next(), pricing.next()) {
        (Some(only), None) => Disposition::NeedsSynthesis(only.into()),
        _ => Disposition::NoActionableSheet,
    }
}

/// Errors that must abort the whole run rather than skip one folder.
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CurrencyError>().is_some() || err.downcast_ref::<rusqlite::Error>().is_some()
}

/// Folder ids the resolver moves folders between.
#[derive(Clone, Debug)]
pub struct Destinations {
    pub procurement_folder_id: String,
    pub wins_folder_id: String,
    pub losses_folder_id: String,
}

/// Where a folder ended up for this run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A cost sheet exists (found or just synthesized) and is ready for submission.
    Ready { cost_sheet: SheetRef, synthesized: bool },
    /// Nothing more to do this run. `delay` is false for skips that made no rate-limited calls.
    Settled { disposition: Disposition, delay: bool },
}

impl Outcome {
    fn settled(disposition: Disposition, delay: bool) -> Self {
        Outcome::Settled { disposition, delay }
    }
}

pub struct FolderResolver<'a> {
    pub sheets: &'a dyn SheetClient,
    pub store: &'a dyn RemoteStore,
    pub oracle: &'a dyn StatusOracle,
    pub status: &'a dyn StatusStore,
    pub retry: &'a RetryPolicy,
    pub sleeper: &'a dyn Sleeper,
    pub destinations: &'a Destinations,
    pub template_id: &'a str,
    pub staleness_days: i64,
    pub today: NaiveDate,
    offer_wait: Cell<Duration>,
}

impl<'a> FolderResolver<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sheets: &'a dyn SheetClient,
        store: &'a dyn RemoteStore,
        oracle: &'a dyn StatusOracle,
        status: &'a dyn StatusStore,
        retry: &'a RetryPolicy,
        sleeper: &'a dyn Sleeper,
        destinations: &'a Destinations,
        template_id: &'a str,
        staleness_days: i64,
        today: NaiveDate,
    ) -> Self {
        Self {
            sheets,
            store,
            oracle,
            status,
            retry,
            sleeper,
            destinations,
            template_id,
            staleness_days,
            today,
            offer_wait: Cell::new(Duration::ZERO),
        }
    }

    /// Time spent reading accepted-offer cells so far.
    pub fn offer_wait(&self) -> Duration {
        self.offer_wait.get()
    }

    /// Resolve `result` and carry out whatever the disposition requires short of submission.
    pub fn settle(&self, result: &FolderScanResult) -> Result<Outcome> {
        match resolve(result) {
            Disposition::HasCostSheet(sheet) => {
                log::info!("cost sheet found: {}", sheet.name);
                Ok(Outcome::Ready {
                    cost_sheet: sheet,
                    synthesized: false,
                })
            }
            Disposition::NeedsSynthesis(pricing) => {
                log::info!("no cost sheet; using pricing sheet {}", pricing.name);
                self.settle_pricing_sheet(result, &pricing)
            }
            other => {
                log::info!("{}: no actionable sheet", result.parent_folder_id);
                Ok(Outcome::settled(other, true))
            }
        }
    }

    fn settle_pricing_sheet(&self, result: &FolderScanResult, pricing: &SheetRef) -> Result<Outcome> {
        if let Some(mark) = self.status.lookup(&pricing.id)? {
            if mark.blocks(MarkKind::Suspended) {
                log::info!("{} is marked suspended", pricing.name);
                return Ok(Outcome::settled(Disposition::Suspended, false));
            }
            if mark.blocks(MarkKind::Forgotten) {
                log::info!("{} is marked forgotten", pricing.name);
                return Ok(Outcome::settled(Disposition::Forgotten, false));
            }
        }

        if let Some(cost) = self.read_offer(&pricing.id)? {
            let synthesizer = CostSheetSynthesizer {
                sheets: self.sheets,
                store: self.store,
                retry: self.retry,
                sleeper: self.sleeper,
                template_id: self.template_id,
            };
            let cost_sheet =
                synthesizer.synthesize(&pricing.id, &result.parent_folder_id, cost, self.today)?;
            return Ok(Outcome::Ready {
                cost_sheet,
                synthesized: true,
            });
        }

        log::info!("no accepted offer; folder age {} days", result.age_days);
        if result.age_days < self.staleness_days {
            return Ok(Outcome::settled(Disposition::NoActionableSheet, true));
        }
        self.escalate(result, pricing)
    }

    /// Read and parse the accepted-offer cell. Empty → `None`; malformed → fatal error.
    pub fn read_offer(&self, pricing_sheet_id: &str) -> Result<Option<i64>> {
        let (rows, waited) = time_awake(self.sleeper, || {
            with_retry(self.retry, self.sleeper, || {
                self.sheets.get_range(pricing_sheet_id, ACCEPTED_OFFER_CELL)
            })
        });
        self.offer_wait.set(self.offer_wait.get() + waited);
        let rows = rows.with_context(|| format!("read accepted offer of {pricing_sheet_id}"))?;
        let cell = rows.first().and_then(|row| row.first()).map(String::as_str);
        Ok(parse_offer_cell(cell)?)
    }

    fn escalate(&self, result: &FolderScanResult, pricing: &SheetRef) -> Result<Outcome> {
        let Some(opp_id) = opportunity_id(&pricing.name) else {
            log::warn!("{}: no opportunity id in sheet name", pricing.name);
            return Ok(Outcome::settled(Disposition::NoActionableSheet, true));
        };
        log::info!("stale folder; checking opportunity {}", opp_id);

        let state = match self.oracle.opportunity_state(opp_id) {
            Ok(state) => state,
            Err(OracleError::UnknownOpportunity(_)) => {
                log::info!("opportunity {} no longer exists; treating as lost", opp_id);
                OpportunityState::Lost
            }
            Err(e) => {
                return Err(e).with_context(|| format!("look up opportunity {opp_id}"));
            }
        };

        let folder = &result.parent_folder_id;
        match state {
            OpportunityState::Lost | OpportunityState::Abandoned => {
                self.move_folder(folder, &self.destinations.losses_folder_id)?;
                Ok(Outcome::settled(Disposition::Lost, true))
            }
            OpportunityState::Won => {
                self.move_folder(folder, &self.destinations.wins_folder_id)?;
                Ok(Outcome::settled(Disposition::Won, true))
            }
            OpportunityState::Suspended => {
                self.mark(pricing, MarkKind::Suspended)?;
                Ok(Outcome::settled(Disposition::Suspended, false))
            }
            OpportunityState::Open => {
                self.mark(pricing, MarkKind::Forgotten)?;
                Ok(Outcome::settled(Disposition::Forgotten, false))
            }
            OpportunityState::Unknown => {
                log::warn!("opportunity {} is in an unrecognised state", opp_id);
                Ok(Outcome::settled(Disposition::NoActionableSheet, true))
            }
        }
    }

    fn mark(&self, pricing: &SheetRef, kind: MarkKind) -> Result<()> {
        let written = self
            .status
            .mark(&pricing.id, &pricing.name, kind)
            .with_context(|| format!("mark {} as {:?}", pricing.name, kind))?;
        if written {
            log::info!("{} marked {:?}", pricing.name, kind);
        } else {
            log::debug!("{} already marked {:?}", pricing.name, kind);
        }
        Ok(())
    }

    /// Move `folder_id` out of the procurement folder into `dest`.
    pub fn move_folder(&self, folder_id: &str, dest: &str) -> Result<()> {
        self.store
            .move_file(folder_id, &self.destinations.procurement_folder_id, dest)
            .with_context(|| format!("move folder {folder_id} to {dest}"))?;
        log::info!("folder {} moved", folder_id);
        Ok(())
    }
}
