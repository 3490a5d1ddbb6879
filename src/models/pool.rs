use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;

/// A token mint pulled out of a pool creation log batch
#[derive(Debug, Clone)]
pub struct PoolCreationEvent {
    pub discovered_token_mint: Pubkey,
    pub raw_log_lines: Vec<String>,
    /// Transaction that emitted the logs
    pub signature: String,
    pub discovered_at: DateTime<Utc>,
}

impl PoolCreationEvent {
    pub fn new(discovered_token_mint: Pubkey, raw_log_lines: Vec<String>, signature: String) -> Self {
        Self {
            discovered_token_mint,
            raw_log_lines,
            signature,
            discovered_at: Utc::now(),
        }
    }
}
