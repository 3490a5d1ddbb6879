use serde::{Deserialize, Serialize};
use std::fmt;

/// The fields of an SPL mint account the risk filter looks at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintMetadata {
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    /// Raw supply, in the token's smallest unit
    pub supply: u64,
    pub decimals: u8,
}

/// Why a candidate was accepted or rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskReason {
    Passed,
    MintAuthorityPresent,
    FreezeAuthorityPresent,
    SupplyBelowThreshold,
    AccountMissing,
    FetchFailed,
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RiskReason::Passed => "passed",
            RiskReason::MintAuthorityPresent => "mint authority not renounced",
            RiskReason::FreezeAuthorityPresent => "freeze authority not renounced",
            RiskReason::SupplyBelowThreshold => "supply below liquidity threshold",
            RiskReason::AccountMissing => "mint account not found",
            RiskReason::FetchFailed => "mint metadata unavailable",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub accepted: bool,
    pub reason: RiskReason,
    /// Token decimals, known whenever the mint could be read
    pub decimals: Option<u8>,
}

impl RiskVerdict {
    pub fn accept(decimals: u8) -> Self {
        Self {
            accepted: true,
            reason: RiskReason::Passed,
            decimals: Some(decimals),
        }
    }

    pub fn reject(reason: RiskReason) -> Self {
        Self {
            accepted: false,
            reason,
            decimals: None,
        }
    }
}
