//! Shared ureq plumbing: agent construction, status mapping, URL building.

use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};
use url::Url;

use crate::error::RemoteError;

/// Timeout for storage, spreadsheet, and back-office calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Timeout for CRM lookups.
pub const CRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Agent that returns non-2xx responses instead of erroring, so statuses can be classified.
pub fn agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Fail with a classified [`RemoteError`] unless the response is 2xx.
pub fn check_status(
    service: &'static str,
    mut resp: Response<Body>,
) -> Result<Response<Body>, RemoteError> {
    let status = resp.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(resp);
    }
    let body = resp.body_mut().read_to_string().unwrap_or_default();
    Err(RemoteError::from_status(service, status, body))
}

/// Check status, then decode the body as JSON.
pub fn read_json<T: DeserializeOwned>(
    service: &'static str,
    resp: Response<Body>,
) -> Result<T, RemoteError> {
    let mut resp = check_status(service, resp)?;
    resp.body_mut()
        .read_json::<T>()
        .map_err(|e| RemoteError::Decode(format!("{service}: {e}")))
}

/// `base` with each of `segments` appended as a percent-encoded path segment.
pub fn endpoint(base: &str, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = Url::parse(base).map_err(|e| RemoteError::Transport(format!("{base}: {e}")))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| RemoteError::Transport(format!("{base}: cannot be a base URL")))?;
        path.pop_if_empty();
        for seg in segments {
            path.push(seg);
        }
    }
    Ok(url)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
