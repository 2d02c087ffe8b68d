//! SkuVault `updateProducts` client.

use serde::Serialize;
use ureq::Agent;

use super::InventorySink;
use super::http;
use crate::error::RemoteError;
use crate::types::InventoryItem;

const SERVICE: &str = "skuvault";
pub const UPDATE_PRODUCTS_URL: &str = "https://app.skuvault.com/api/products/updateProducts";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateProducts<'a> {
    items: &'a [InventoryItem],
    user_token: &'a str,
    tenant_token: &'a str,
}

pub struct SkuVaultClient {
    agent: Agent,
    url: String,
    user_token: String,
    tenant_token: String,
}

impl SkuVaultClient {
    pub fn new(user_token: impl Into<String>, tenant_token: impl Into<String>) -> Self {
        Self {
            agent: http::agent(http::DEFAULT_TIMEOUT),
            url: UPDATE_PRODUCTS_URL.to_string(),
            user_token: user_token.into(),
            tenant_token: tenant_token.into(),
        }
    }
}

impl InventorySink for SkuVaultClient {
    fn update_products(&self, items: &[InventoryItem]) -> Result<(), RemoteError> {
        let body = UpdateProducts {
            items,
            user_token: &self.user_token,
            tenant_token: &self.tenant_token,
        };
        let resp = self.agent.post(&self.url).send_json(&body)?;
        let mut resp = http::check_status(SERVICE, resp)?;
        let text = resp.body_mut().read_to_string().unwrap_or_default();
        log::debug!("updateProducts response: {}", text);
        Ok(())
    }
}
