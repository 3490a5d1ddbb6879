use anyhow::Result;
use log::debug;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_client::rpc_request::RpcRequest;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use solana_transaction_status::TransactionStatus;
use std::sync::Arc;

use crate::errors::NetworkError;
use crate::models::MintMetadata;
use crate::solana::rpc_helpers::{make_raw_rpc_request, parse_mint_account};

/// Wrapper around the nonblocking Solana RPC client.
///
/// Cheap to clone; every clone shares one HTTP connection pool.
#[derive(Clone)]
pub struct SolanaClient {
    rpc_client: Arc<RpcClient>,
    commitment: CommitmentConfig,
}

impl SolanaClient {
    /// Create a new Solana client with the given RPC URL
    pub fn new(rpc_url: &str) -> Self {
        Self::new_with_commitment(rpc_url, CommitmentConfig::confirmed())
    }

    pub fn new_with_commitment(rpc_url: &str, commitment: CommitmentConfig) -> Self {
        let rpc_client = RpcClient::new_with_commitment(rpc_url.to_string(), commitment);
        Self {
            rpc_client: Arc::new(rpc_client),
            commitment,
        }
    }

    /// Get the current Solana slot
    pub async fn get_slot(&self) -> Result<u64> {
        debug!("Getting current slot");
        let slot = self.rpc_client.get_slot().await?;
        Ok(slot)
    }

    /// Get an account's balance in lamports
    pub async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64> {
        let balance = self.rpc_client.get_balance(pubkey).await?;
        Ok(balance)
    }

    /// Fetch a mint account with `jsonParsed` encoding.
    ///
    /// `Ok(None)` means the account does not exist.
    pub async fn get_mint_metadata(&self, mint: &Pubkey) -> Result<Option<MintMetadata>, NetworkError> {
        let params = serde_json::json!([
            mint.to_string(),
            { "encoding": "jsonParsed", "commitment": self.commitment.commitment }
        ]);
        let response = make_raw_rpc_request(&self.rpc_client, RpcRequest::GetAccountInfo, params).await?;
        Ok(parse_mint_account(response)?)
    }

    /// Broadcast an already signed transaction without preflight simulation
    pub async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature, NetworkError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            ..RpcSendTransactionConfig::default()
        };
        let signature = self
            .rpc_client
            .send_transaction_with_config(transaction, config)
            .await?;
        Ok(signature)
    }

    /// Look a signature up, including transactions older than the status cache
    pub async fn get_signature_status(&self, signature: &Signature) -> Result<Option<TransactionStatus>, NetworkError> {
        let response = self
            .rpc_client
            .get_signature_statuses_with_history(&[*signature])
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    pub fn commitment(&self) -> CommitmentConfig {
        self.commitment
    }
}
