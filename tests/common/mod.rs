//! Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use raydium_pool_sniper::config::Config;
use raydium_pool_sniper::errors::{NetworkError, PriceError, SwapError};
use raydium_pool_sniper::jupiter::{PriceFeed, RouteQuoter, SwapExecutor};
use raydium_pool_sniper::ledger::PositionSink;
use raydium_pool_sniper::models::{ClosedPosition, MintMetadata, SignatureState, SwapQuoteRoute, SwapResult};
use raydium_pool_sniper::strategy::{MintMetadataSource, TradingServices};

/// Quote amount 100, integer decimals on both sides, exits at +25% / -20%
pub fn test_config() -> Config {
    Config {
        quote_amount: 100,
        quote_decimals: 0,
        take_profit: 1.25,
        stop_loss: 0.8,
        poll_interval_seconds: 1,
        confirm_timeout_seconds: 5,
        exit_alert_after: 2,
        ..Config::default()
    }
}

/// Answers buys and sells from separate queues; an empty queue means no route
pub struct ScriptedQuoter {
    quote_mint: Pubkey,
    buys: Mutex<VecDeque<Option<u64>>>,
    sells: Mutex<VecDeque<Option<u64>>>,
    calls: Mutex<Vec<(Pubkey, Pubkey, u64)>>,
}

impl ScriptedQuoter {
    pub fn new(config: &Config, buys: Vec<Option<u64>>, sells: Vec<Option<u64>>) -> Self {
        Self {
            quote_mint: config.quote_mint,
            buys: Mutex::new(buys.into()),
            sells: Mutex::new(sells.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Pubkey, Pubkey, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RouteQuoter for ScriptedQuoter {
    async fn quote(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
    ) -> Result<Option<SwapQuoteRoute>, NetworkError> {
        self.calls.lock().unwrap().push((*input_mint, *output_mint, amount));
        let queue = if *input_mint == self.quote_mint { &self.buys } else { &self.sells };
        let next = queue.lock().unwrap().pop_front().flatten();
        Ok(next.map(|out| SwapQuoteRoute {
            input_mint: *input_mint,
            output_mint: *output_mint,
            input_amount: amount,
            expected_output_amount: out,
            route_descriptor: serde_json::json!({ "outAmount": out.to_string() }),
        }))
    }
}

/// What the next `execute` call does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Fill,
    Timeout,
    Revert,
}

/// Fills at the quoted amount unless told otherwise
#[derive(Default)]
pub struct ScriptedExecutor {
    outcomes: Mutex<VecDeque<Outcome>>,
    statuses: Mutex<VecDeque<SignatureState>>,
    executed: Mutex<Vec<(Pubkey, Pubkey, u64, Signature)>>,
    lookups: Mutex<Vec<Signature>>,
}

impl ScriptedExecutor {
    pub fn new(outcomes: Vec<Outcome>, statuses: Vec<SignatureState>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            statuses: Mutex::new(statuses.into()),
            ..Default::default()
        }
    }

    pub fn executed(&self) -> Vec<(Pubkey, Pubkey, u64, Signature)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<Signature> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapExecutor for ScriptedExecutor {
    async fn execute(&self, route: SwapQuoteRoute) -> Result<SwapResult, SwapError> {
        let signature = Signature::new_unique();
        self.executed
            .lock()
            .unwrap()
            .push((route.input_mint, route.output_mint, route.input_amount, signature));

        match self.outcomes.lock().unwrap().pop_front().unwrap_or(Outcome::Fill) {
            Outcome::Fill => Ok(SwapResult {
                signature,
                realized_output_amount: route.expected_output_amount,
            }),
            Outcome::Timeout => Err(SwapError::ConfirmTimeout { signature }),
            Outcome::Revert => Err(SwapError::Failed {
                signature,
                reason: "slippage tolerance exceeded".to_string(),
            }),
        }
    }

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureState, NetworkError> {
        self.lookups.lock().unwrap().push(*signature);
        Ok(self.statuses.lock().unwrap().pop_front().unwrap_or(SignatureState::Unknown))
    }
}

/// Replays a price series; once exhausted every lookup misses
#[derive(Default)]
pub struct ScriptedPrices {
    prices: Mutex<VecDeque<f64>>,
}

impl ScriptedPrices {
    pub fn new(prices: Vec<f64>) -> Self {
        Self {
            prices: Mutex::new(prices.into()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.prices.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceFeed for ScriptedPrices {
    async fn price(&self, mint: &Pubkey) -> Result<f64, PriceError> {
        self.prices
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PriceError::Missing(mint.to_string()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub closed: Mutex<Vec<ClosedPosition>>,
    pub abandoned: Mutex<Vec<(Pubkey, String)>>,
}

impl RecordingSink {
    pub fn closed(&self) -> Vec<ClosedPosition> {
        self.closed.lock().unwrap().clone()
    }

    pub fn abandoned(&self) -> Vec<(Pubkey, String)> {
        self.abandoned.lock().unwrap().clone()
    }
}

#[async_trait]
impl PositionSink for RecordingSink {
    async fn position_closed(&self, closed: &ClosedPosition) {
        self.closed.lock().unwrap().push(closed.clone());
    }

    async fn position_abandoned(&self, token_mint: &Pubkey, reason: &str) {
        self.abandoned.lock().unwrap().push((*token_mint, reason.to_string()));
    }
}

/// Mint registry; unknown mints have no account
#[derive(Default)]
pub struct StaticMints {
    mints: HashMap<Pubkey, MintMetadata>,
}

impl StaticMints {
    pub fn with(mut self, mint: Pubkey, metadata: MintMetadata) -> Self {
        self.mints.insert(mint, metadata);
        self
    }
}

#[async_trait]
impl MintMetadataSource for StaticMints {
    async fn fetch_mint(&self, mint: &Pubkey) -> Result<Option<MintMetadata>, NetworkError> {
        Ok(self.mints.get(mint).cloned())
    }
}

/// A renounced mint with plenty of supply and no decimals
pub fn safe_mint() -> MintMetadata {
    MintMetadata {
        mint_authority: None,
        freeze_authority: None,
        supply: 1_000_000,
        decimals: 0,
    }
}

pub fn rug_mint() -> MintMetadata {
    MintMetadata {
        mint_authority: Some(Pubkey::new_unique().to_string()),
        ..safe_mint()
    }
}

pub struct Harness {
    pub quoter: Arc<ScriptedQuoter>,
    pub executor: Arc<ScriptedExecutor>,
    pub prices: Arc<ScriptedPrices>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(quoter: ScriptedQuoter, executor: ScriptedExecutor, prices: ScriptedPrices) -> Self {
        Self {
            quoter: Arc::new(quoter),
            executor: Arc::new(executor),
            prices: Arc::new(prices),
            sink: Arc::new(RecordingSink::default()),
        }
    }

    pub fn services(&self) -> TradingServices {
        TradingServices {
            quoter: self.quoter.clone(),
            executor: self.executor.clone(),
            prices: self.prices.clone(),
            sink: self.sink.clone(),
        }
    }
}
