//! Insightly v3.1 opportunity lookup.

use serde::Deserialize;
use ureq::Agent;

use super::StatusOracle;
use super::http::{self, endpoint};
use crate::error::{OracleError, RemoteError};
use crate::types::OpportunityState;

const SERVICE: &str = "insightly";
const OPPORTUNITIES_URL: &str = "https://api.insightly.com/v3.1/Opportunities";

#[derive(Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct Opportunity {
    opportunity_id: i64,
    opportunity_state: OpportunityState,
}

pub struct InsightlyClient {
    agent: Agent,
    api_key: String,
}

impl InsightlyClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            agent: http::agent(http::CRM_TIMEOUT),
            api_key: api_key.into(),
        }
    }
}

impl StatusOracle for InsightlyClient {
    fn opportunity_state(&self, opportunity_id: &str) -> Result<OpportunityState, OracleError> {
        let url = endpoint(OPPORTUNITIES_URL, &[opportunity_id])?;
        let resp = self
            .agent
            .get(url.as_str())
            .header("Authorization", format!("Basic {}", self.api_key))
            .call()
            .map_err(RemoteError::from)?;
        // A deleted opportunity comes back either as 404 or as a body that is not an opportunity.
        match http::read_json::<Opportunity>(SERVICE, resp) {
            Ok(opp) => {
                log::debug!("opportunity {} is {:?}", opp.opportunity_id, opp.opportunity_state);
                Ok(opp.opportunity_state)
            }
            Err(RemoteError::NotFound { .. }) | Err(RemoteError::Decode(_)) => {
                Err(OracleError::UnknownOpportunity(opportunity_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
