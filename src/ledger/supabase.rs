use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::LedgerConfig;
use crate::errors::{LedgerError, NetworkError};
use crate::ledger::BalanceLedger;

/// Calls the `increment_balance` stored procedure over the PostgREST RPC endpoint
pub struct SupabaseLedger {
    http: Client,
    rpc_url: String,
    api_key: String,
}

impl SupabaseLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self, NetworkError> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            rpc_url: format!("{}/rest/v1/rpc/increment_balance", config.url),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl BalanceLedger for SupabaseLedger {
    async fn increment_balance(&self, wallet: &str, delta: i64) -> Result<(), LedgerError> {
        let response = self
            .http
            .post(&self.rpc_url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "p_wallet": wallet, "p_delta": delta }))
            .send()
            .await
            .map_err(NetworkError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NetworkError::Status { status: status.as_u16(), body }.into());
        }
        Ok(())
    }
}
