use async_trait::async_trait;
use log::{debug, info, warn};
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::errors::{NetworkError, SwapError};
use crate::jupiter::{JupiterClient, SwapExecutor};
use crate::models::{SignatureState, SwapQuoteRoute, SwapResult};
use crate::solana::{SolanaClient, Wallet};

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Executes Jupiter routes with the bot's wallet
pub struct JupiterSwapExecutor {
    jupiter: Arc<JupiterClient>,
    solana: SolanaClient,
    wallet: Arc<Wallet>,
    confirm_timeout: Duration,
}

impl JupiterSwapExecutor {
    pub fn new(
        jupiter: Arc<JupiterClient>,
        solana: SolanaClient,
        wallet: Arc<Wallet>,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            jupiter,
            solana,
            wallet,
            confirm_timeout,
        }
    }

    /// Poll the signature until it reaches our commitment, fails, or the window closes
    async fn confirm(&self, signature: Signature) -> Result<(), SwapError> {
        let wait = async {
            loop {
                match self.signature_status(&signature).await {
                    Ok(SignatureState::Confirmed) => return Ok(()),
                    Ok(SignatureState::Failed(reason)) => {
                        return Err(SwapError::Failed { signature, reason })
                    }
                    Ok(SignatureState::Unknown) => {}
                    Err(e) => debug!("Status lookup for {} failed, retrying: {}", signature, e),
                }
                time::sleep(CONFIRM_POLL_INTERVAL).await;
            }
        };

        match time::timeout(self.confirm_timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Swap {} not confirmed after {:?}", signature, self.confirm_timeout);
                Err(SwapError::ConfirmTimeout { signature })
            }
        }
    }
}

#[async_trait]
impl SwapExecutor for JupiterSwapExecutor {
    async fn execute(&self, route: SwapQuoteRoute) -> Result<SwapResult, SwapError> {
        let expected_output = route.expected_output_amount;
        let (input_mint, output_mint) = (route.input_mint, route.output_mint);

        let unsigned = self
            .jupiter
            .swap_transaction(route, &self.wallet.pubkey())
            .await
            .map_err(|e| SwapError::Build(e.to_string()))?;
        let signed = self
            .wallet
            .sign_versioned_transaction(unsigned)
            .map_err(|e| SwapError::Build(e.to_string()))?;

        let signature = self
            .solana
            .send_transaction(&signed)
            .await
            .map_err(|e| SwapError::Submit(e.to_string()))?;
        debug!("Submitted swap {} -> {}: {}", input_mint, output_mint, signature);

        self.confirm(signature).await?;
        info!("Swap {} confirmed", signature);

        // Jupiter enforces the slippage bound on-chain, so the quoted output is what we book
        Ok(SwapResult {
            signature,
            realized_output_amount: expected_output,
        })
    }

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureState, NetworkError> {
        let state = match self.solana.get_signature_status(signature).await? {
            Some(status) => {
                if let Some(err) = &status.err {
                    SignatureState::Failed(err.to_string())
                } else if status.satisfies_commitment(self.solana.commitment()) {
                    SignatureState::Confirmed
                } else {
                    SignatureState::Unknown
                }
            }
            None => SignatureState::Unknown,
        };
        Ok(state)
    }
}
