//! Back-office service at `BASE_URL`: sheet status marks, purchase orders and run summaries.

use serde::Deserialize;
use serde_json::json;
use ureq::Agent;

use super::http::{self, endpoint, read_json};
use super::{PurchaseOrderSink, ReportSink, StatusStore};
use crate::engine::stats::RunReport;
use crate::error::RemoteError;
use crate::types::{MarkKind, PoReply, StatusMark};

const SERVICE: &str = "backoffice";
const MARKED_MESSAGE: &str = "Sheet has been marked with failure reason";

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<StatusData>,
}

#[derive(Deserialize, Default)]
struct StatusData {
    #[serde(default)]
    sheet_name: String,
    #[serde(default)]
    is_reviewed: bool,
    #[serde(default)]
    sheet_failure_reason: String,
}

pub struct BackOfficeClient {
    agent: Agent,
    base_url: String,
}

impl BackOfficeClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            agent: http::agent(http::DEFAULT_TIMEOUT),
            base_url: base_url.into(),
        }
    }

    fn status_url(&self, sheet_id: Option<&str>) -> Result<url::Url, RemoteError> {
        let mut segments = vec!["api", "v1", "costSheet", "status"];
        if let Some(id) = sheet_id {
            segments.push(id);
        }
        endpoint(&self.base_url, &segments)
    }
}

impl StatusStore for BackOfficeClient {
    fn lookup(&self, sheet_id: &str) -> anyhow::Result<Option<StatusMark>> {
        let url = self.status_url(Some(sheet_id))?;
        let resp = self.agent.get(url.as_str()).call().map_err(RemoteError::from)?;
        let status: StatusResponse = match read_json(SERVICE, resp) {
            Ok(s) => s,
            Err(RemoteError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let data = status.data.unwrap_or_default();
        if data.sheet_failure_reason.is_empty() {
            return Ok(None);
        }
        Ok(Some(StatusMark {
            sheet_id: sheet_id.to_string(),
            title: data.sheet_name,
            reason: data.sheet_failure_reason,
            is_reviewed: data.is_reviewed,
        }))
    }

    fn mark(&self, sheet_id: &str, title: &str, kind: MarkKind) -> anyhow::Result<bool> {
        if let Some(existing) = self.lookup(sheet_id)?
            && existing.reason == kind.reason()
            && !existing.is_reviewed
        {
            return Ok(false);
        }
        let url = self.status_url(None)?;
        let resp = self
            .agent
            .post(url.as_str())
            .send_json(json!({
                "sheetID": sheet_id,
                "reason": kind.reason(),
                "resolution": kind.resolution(),
                "title": title,
            }))
            .map_err(RemoteError::from)?;
        let status: StatusResponse = read_json(SERVICE, resp)?;
        if status.message != MARKED_MESSAGE {
            log::warn!("{}: unexpected mark response: {}", sheet_id, status.message);
            return Ok(false);
        }
        Ok(true)
    }
}

impl ReportSink for BackOfficeClient {
    fn send_report(&self, report: &RunReport) -> Result<(), RemoteError> {
        let url = endpoint(&self.base_url, &["api", "v1", "costSheet", "upload", "run"])?;
        let resp = self.agent.post(url.as_str()).send_json(report)?;
        http::check_status(SERVICE, resp)?;
        Ok(())
    }
}

impl PurchaseOrderSink for BackOfficeClient {
    /// Replies carry their outcome in `message`, sometimes with a non-2xx status; those are
    /// returned as replies rather than errors.
    fn upload_cost_sheet(&self, sheet_url: &str) -> Result<PoReply, RemoteError> {
        let url = endpoint(&self.base_url, &["api", "v1", "costSheet", "upload"])?;
        let mut resp = self
            .agent
            .post(url.as_str())
            .send_json(json!({ "url": sheet_url }))?;
        let status = resp.status().as_u16();
        let body = resp.body_mut().read_to_string()?;
        match serde_json::from_str::<PoReply>(&body) {
            Ok(reply) if !reply.message.is_empty() => Ok(reply),
            _ if !(200..300).contains(&status) => Err(RemoteError::from_status(SERVICE, status, body)),
            Ok(reply) => Ok(reply),
            Err(e) => Err(RemoteError::Decode(format!("{SERVICE}: {e}"))),
        }
    }
}
