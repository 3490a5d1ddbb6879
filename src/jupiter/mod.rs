//! Swap aggregator access.
//!
//! The traits are the seams the position monitor trades through; the
//! Jupiter-backed implementations live next to them.

mod client;
mod executor;

pub use client::JupiterClient;
pub use executor::JupiterSwapExecutor;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::errors::{NetworkError, PriceError, SwapError};
use crate::models::{SignatureState, SwapQuoteRoute, SwapResult};

/// Finds the best route for a swap.
#[async_trait]
pub trait RouteQuoter: Send + Sync {
    /// `Ok(None)` means no route exists right now (usually thin liquidity);
    /// callers should not retry immediately.
    async fn quote(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
    ) -> Result<Option<SwapQuoteRoute>, NetworkError>;
}

/// Turns a route into a confirmed on-chain swap.
///
/// Spends funds. After a `SwapError::ConfirmTimeout` the caller must resolve
/// the signature with [`SwapExecutor::signature_status`] before submitting
/// anything else for the same position.
#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn execute(&self, route: SwapQuoteRoute) -> Result<SwapResult, SwapError>;

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureState, NetworkError>;
}

/// Current price of a token, in quote asset per token.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn price(&self, mint: &Pubkey) -> Result<f64, PriceError>;
}
