use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

/// A route offered by the aggregator.
///
/// Deliberately not `Clone`: a route is handed to the executor by value and
/// spent exactly once.
#[derive(Debug)]
pub struct SwapQuoteRoute {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub input_amount: u64,
    pub expected_output_amount: u64,
    /// Aggregator-defined route payload, posted back verbatim when swapping
    pub route_descriptor: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub signature: Signature,
    pub realized_output_amount: u64,
}

/// Outcome of looking a submitted transaction up by signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    Confirmed,
    Failed(String),
    /// Not seen by the cluster (yet)
    Unknown,
}
