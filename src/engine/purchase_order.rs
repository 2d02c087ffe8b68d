//! Purchase-order submission: hand a cost sheet URL to the back office and read its verdict.

use anyhow::{Context, Result};

use crate::error::RemoteError;
use crate::remote::PurchaseOrderSink;
use crate::types::PoReply;

use super::retry::{RetryClass, RetryPolicy, Sleeper, with_retry};

pub const PO_CREATED: &str = "PO Created Successfully";
pub const PO_EXISTS: &str = "PO Already Exists";
pub const ALREADY_PROCESSED: &str = "Sheet has already been processed";
/// The back office could not write back to the sheet; worth another attempt.
pub const UPSTREAM_BAD_GATEWAY: &str = "Error updating sheet: Request failed with status code 502";

/// Edit URL the back office expects for a sheet id.
pub fn sheet_url(sheet_id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{sheet_id}/edit#gid=0")
}

/// What the back office made of an uploaded cost sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoOutcome {
    /// A new purchase order was raised.
    Created,
    /// The sheet was handled on an earlier run.
    AlreadyExists,
    /// Accepted with a message we have no specific handling for.
    Accepted(String),
    /// Refused; the folder stays where it is.
    Rejected(String),
}

impl PoOutcome {
    pub fn from_reply(reply: &PoReply) -> Self {
        let message = reply.message.trim();
        match (reply.error, message) {
            (false, PO_CREATED) => PoOutcome::Created,
            (_, PO_EXISTS) | (false, ALREADY_PROCESSED) => PoOutcome::AlreadyExists,
            (false, _) => PoOutcome::Accepted(message.to_string()),
            (true, _) => PoOutcome::Rejected(message.to_string()),
        }
    }

    /// Whether the folder is done and moves to Wins.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PoOutcome::Rejected(_))
    }
}

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("back office: {0}")]
    Upstream(String),
}

impl RetryClass for UploadError {
    fn is_rate_limited(&self) -> bool {
        match self {
            UploadError::Remote(e) => e.is_rate_limited(),
            UploadError::Upstream(_) => false,
        }
    }
}

/// Upload `sheet_id` for purchase-order creation. Transport failures and the back office's
/// upstream 502 reply are retried under `retry`; `calls` counts every request made.
pub fn submit_purchase_order(
    sink: &dyn PurchaseOrderSink,
    retry: &RetryPolicy,
    sleeper: &dyn Sleeper,
    sheet_id: &str,
    calls: &mut usize,
) -> Result<PoOutcome> {
    let url = sheet_url(sheet_id);
    log::info!("uploading {}", url);
    let reply = with_retry(retry, sleeper, || {
        *calls += 1;
        let reply = sink.upload_cost_sheet(&url)?;
        if reply.error && reply.message.trim() == UPSTREAM_BAD_GATEWAY {
            return Err(UploadError::Upstream(reply.message));
        }
        Ok(reply)
    })
    .with_context(|| format!("upload cost sheet {sheet_id}"))?;

    let outcome = PoOutcome::from_reply(&reply);
    match &outcome {
        PoOutcome::Created => log::info!("{}: purchase order created", sheet_id),
        PoOutcome::AlreadyExists => log::info!("{}: already processed", sheet_id),
        PoOutcome::Accepted(msg) => log::warn!("{}: unhandled reply {:?}", sheet_id, msg),
        PoOutcome::Rejected(msg) => log::warn!("{}: rejected: {}", sheet_id, msg),
    }
    Ok(outcome)
}
