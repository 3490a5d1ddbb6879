use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::fmt;

/// Lifecycle of a sniped position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Open,
    Entering,
    Holding,
    Exiting,
    Closed,
    Abandoned,
}

impl PositionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PositionState::Closed | PositionState::Abandoned)
    }

    /// Whether moving to `next` is a legal step of the state machine
    pub fn can_transition_to(self, next: PositionState) -> bool {
        use PositionState::*;
        matches!(
            (self, next),
            (Open, Entering)
                | (Entering, Holding)
                | (Entering, Abandoned)
                | (Holding, Exiting)
                | (Exiting, Holding)
                | (Exiting, Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PositionState::Open => "open",
            PositionState::Entering => "entering",
            PositionState::Holding => "holding",
            PositionState::Exiting => "exiting",
            PositionState::Closed => "closed",
            PositionState::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens held after a confirmed entry swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub token_mint: Pubkey,
    /// Quote asset spent, raw units
    pub entry_amount_in: u64,
    /// Tokens received, raw units
    pub entry_amount_out: u64,
    pub token_decimals: u8,
    pub quote_decimals: u8,
    pub entry_signature: Signature,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Entry price in quote asset per token, decimal adjusted.
    pub fn entry_price(&self) -> f64 {
        let amount_in = self.entry_amount_in as f64 / 10f64.powi(self.quote_decimals as i32);
        let amount_out = self.entry_amount_out as f64 / 10f64.powi(self.token_decimals as i32);
        amount_in / amount_out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "take_profit",
            ExitReason::StopLoss => "stop_loss",
        }
    }
}

/// Final record of a position that was sold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedPosition {
    pub token_mint: Pubkey,
    pub entry_amount_in: u64,
    pub entry_amount_out: u64,
    pub exit_amount_out: u64,
    /// Realized profit (negative for a loss), quote asset raw units
    pub profit: i64,
    pub exit_reason: ExitReason,
    pub entry_signature: Signature,
    pub exit_signature: Signature,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

impl ClosedPosition {
    pub fn from_exit(
        position: &Position,
        exit_amount_out: u64,
        exit_reason: ExitReason,
        exit_signature: Signature,
    ) -> Self {
        let profit = exit_amount_out as i128 - position.entry_amount_in as i128;
        Self {
            token_mint: position.token_mint,
            entry_amount_in: position.entry_amount_in,
            entry_amount_out: position.entry_amount_out,
            exit_amount_out,
            profit: profit.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            exit_reason,
            entry_signature: position.entry_signature,
            exit_signature,
            opened_at: position.opened_at,
            closed_at: Utc::now(),
        }
    }
}
