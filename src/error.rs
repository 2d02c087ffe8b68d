//! Typed errors for remote calls, currency cells, and CRM lookups.

/// Failure of one remote request/response exchange.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{service}: rate limited")]
    RateLimited { service: &'static str },

    #[error("{service}: server error {status}")]
    Server { service: &'static str, status: u16 },

    #[error("{service}: HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service}: not found")]
    NotFound { service: &'static str },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Map a non-success HTTP status (and its body) to an error.
    pub fn from_status(service: &'static str, status: u16, body: String) -> Self {
        match status {
            429 => RemoteError::RateLimited { service },
            404 => RemoteError::NotFound { service },
            s if s >= 500 => RemoteError::Server { service, status: s },
            // Sheets reports quota exhaustion as 403 in some regions.
            403 if body.contains("RESOURCE_EXHAUSTED") || body.contains("rateLimitExceeded") => {
                RemoteError::RateLimited { service }
            }
            s => RemoteError::Status {
                service,
                status: s,
                body,
            },
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemoteError::RateLimited { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

impl From<ureq::Error> for RemoteError {
    fn from(e: ureq::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

/// Offer/cost cell that could not be read as a currency amount.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CurrencyError {
    #[error("empty currency cell")]
    Empty,

    #[error("malformed currency value: {0:?}")]
    Malformed(String),
}

/// CRM lookup failure. `UnknownOpportunity` is the routed "record no longer exists" case.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("opportunity {0} does not exist")]
    UnknownOpportunity(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
