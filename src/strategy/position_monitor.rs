use log::{debug, error, info, warn};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::errors::SwapError;
use crate::jupiter::{PriceFeed, RouteQuoter, SwapExecutor};
use crate::ledger::PositionSink;
use crate::models::{ClosedPosition, ExitReason, Position, PositionState, SignatureState, SwapResult};
use crate::utils::{format_change, format_pubkey, to_ui_amount};

/// Everything a monitor trades through. Cloning shares the same clients.
#[derive(Clone)]
pub struct TradingServices {
    pub quoter: Arc<dyn RouteQuoter>,
    pub executor: Arc<dyn SwapExecutor>,
    pub prices: Arc<dyn PriceFeed>,
    pub sink: Arc<dyn PositionSink>,
}

/// Decide whether a price ratio crosses either exit threshold (inclusive)
pub fn evaluate_exit(ratio: f64, take_profit: f64, stop_loss: f64) -> Option<ExitReason> {
    if ratio >= take_profit {
        Some(ExitReason::TakeProfit)
    } else if ratio <= stop_loss {
        Some(ExitReason::StopLoss)
    } else {
        None
    }
}

/// A sell that was broadcast but never confirmed inside the confirm window
#[derive(Debug)]
struct PendingExit {
    signature: Signature,
    expected_output: u64,
    reason: ExitReason,
    recorded_at: Instant,
}

/// Owns one token's position from entry swap to exit swap
pub struct PositionMonitor {
    token_mint: Pubkey,
    token_decimals: u8,
    config: Arc<Config>,
    services: TradingServices,
    state: PositionState,
    position: Option<Position>,
    pending_exit: Option<PendingExit>,
    failed_exits: u32,
}

impl PositionMonitor {
    pub fn new(token_mint: Pubkey, token_decimals: u8, config: Arc<Config>, services: TradingServices) -> Self {
        Self {
            token_mint,
            token_decimals,
            config,
            services,
            state: PositionState::Open,
            position: None,
            pending_exit: None,
            failed_exits: 0,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn consecutive_failed_exits(&self) -> u32 {
        self.failed_exits
    }

    fn transition(&mut self, next: PositionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!("{}: {} -> {}", format_pubkey(&self.token_mint), self.state, next);
        self.state = next;
    }

    /// Status of a submitted swap; lookup failures count as not-yet-known
    async fn lookup(&self, signature: &Signature) -> SignatureState {
        match self.services.executor.signature_status(signature).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Status lookup for {} failed: {}", signature, e);
                SignatureState::Unknown
            }
        }
    }

    /// Keep looking a timed-out buy up for one more confirm window, polling at
    /// the price poll interval. Returns the last state seen.
    async fn await_late_landing(&self, signature: &Signature) -> SignatureState {
        let deadline = Instant::now() + self.config.confirm_timeout();
        loop {
            let state = self.lookup(signature).await;
            let now = Instant::now();
            if state != SignatureState::Unknown || now >= deadline {
                return state;
            }
            debug!("Buy {} still unresolved, checking again", signature);
            time::sleep(self.config.poll_interval().min(deadline - now)).await;
        }
    }

    async fn abandon(&mut self, reason: &str) -> PositionState {
        self.transition(PositionState::Abandoned);
        info!("Abandoning {}: {}", format_pubkey(&self.token_mint), reason);
        self.services.sink.position_abandoned(&self.token_mint, reason).await;
        self.state
    }

    /// Buy the token with the configured quote amount
    pub async fn enter(&mut self) -> PositionState {
        if self.state != PositionState::Open {
            warn!("Entry requested for {} in state {}", format_pubkey(&self.token_mint), self.state);
            return self.state;
        }
        self.transition(PositionState::Entering);

        let route = match self
            .services
            .quoter
            .quote(&self.config.quote_mint, &self.token_mint, self.config.quote_amount)
            .await
        {
            Ok(Some(route)) => route,
            Ok(None) => return self.abandon("no buy route").await,
            Err(e) => {
                warn!("Buy quote for {} failed: {}", format_pubkey(&self.token_mint), e);
                return self.abandon("buy quote failed").await;
            }
        };
        let amount_in = route.input_amount;
        let expected_output = route.expected_output_amount;

        let result = match self.services.executor.execute(route).await {
            Ok(result) => result,
            Err(SwapError::ConfirmTimeout { signature }) => match self.await_late_landing(&signature).await {
                SignatureState::Confirmed => SwapResult {
                    signature,
                    realized_output_amount: expected_output,
                },
                state => {
                    // Funds may still move if this lands later still; leave a trail
                    error!(
                        "Buy {} for {} unresolved after timeout ({:?})",
                        signature,
                        format_pubkey(&self.token_mint),
                        state
                    );
                    return self.abandon("buy not confirmed").await;
                }
            },
            Err(e) => {
                warn!("Buy of {} failed: {}", format_pubkey(&self.token_mint), e);
                return self.abandon("buy failed").await;
            }
        };

        if result.realized_output_amount == 0 {
            error!("Buy {} returned no tokens for {}", result.signature, format_pubkey(&self.token_mint));
            return self.abandon("buy returned no tokens").await;
        }

        let position = Position {
            token_mint: self.token_mint,
            entry_amount_in: amount_in,
            entry_amount_out: result.realized_output_amount,
            token_decimals: self.token_decimals,
            quote_decimals: self.config.quote_decimals,
            entry_signature: result.signature,
            opened_at: chrono::Utc::now(),
        };
        info!(
            "Bought {} {} for {} (entry price {:.9}), tx: {}",
            to_ui_amount(position.entry_amount_out, position.token_decimals),
            format_pubkey(&self.token_mint),
            to_ui_amount(amount_in, self.config.quote_decimals),
            position.entry_price(),
            result.signature
        );
        self.position = Some(position);
        self.transition(PositionState::Holding);
        self.state
    }

    /// One poll: resolve any pending sell, then check the price against the thresholds
    pub async fn tick(&mut self) -> PositionState {
        if self.state != PositionState::Holding {
            return self.state;
        }

        if let Some(pending) = self.pending_exit.take() {
            match self.lookup(&pending.signature).await {
                SignatureState::Confirmed => {
                    info!("Earlier sell {} landed", pending.signature);
                    self.transition(PositionState::Exiting);
                    return self
                        .close(pending.reason, pending.expected_output, pending.signature)
                        .await;
                }
                SignatureState::Failed(reason) => {
                    info!("Earlier sell {} failed on-chain ({}), retrying exit", pending.signature, reason);
                }
                SignatureState::Unknown if pending.recorded_at.elapsed() < self.config.confirm_timeout() => {
                    debug!("Sell {} still unresolved, waiting", pending.signature);
                    self.pending_exit = Some(pending);
                    return self.state;
                }
                SignatureState::Unknown => {
                    warn!("Sell {} never landed, retrying exit", pending.signature);
                }
            }
        }

        let Some(entry_price) = self.position.as_ref().map(Position::entry_price) else {
            return self.state;
        };

        let price = match self.services.prices.price(&self.token_mint).await {
            Ok(price) => price,
            Err(e) => {
                warn!("Price fetch for {} failed: {}", format_pubkey(&self.token_mint), e);
                return self.state;
            }
        };

        let ratio = price / entry_price;
        match evaluate_exit(ratio, self.config.take_profit, self.config.stop_loss) {
            Some(reason) => {
                info!(
                    "{} at {:.9} ({}), {} hit",
                    format_pubkey(&self.token_mint),
                    price,
                    format_change(ratio),
                    reason.as_str()
                );
                self.exit(reason).await
            }
            None => {
                info!("{} price {:.9} change {}", format_pubkey(&self.token_mint), price, format_change(ratio));
                self.state
            }
        }
    }

    /// Sell the whole position back into the quote asset
    async fn exit(&mut self, reason: ExitReason) -> PositionState {
        let Some(amount) = self.position.as_ref().map(|p| p.entry_amount_out) else {
            return self.state;
        };
        self.transition(PositionState::Exiting);

        let route = match self
            .services
            .quoter
            .quote(&self.token_mint, &self.config.quote_mint, amount)
            .await
        {
            Ok(Some(route)) => route,
            Ok(None) => {
                warn!("No sell route for {}", format_pubkey(&self.token_mint));
                return self.exit_failed();
            }
            Err(e) => {
                warn!("Sell quote for {} failed: {}", format_pubkey(&self.token_mint), e);
                return self.exit_failed();
            }
        };
        let expected_output = route.expected_output_amount;

        match self.services.executor.execute(route).await {
            Ok(result) => {
                self.close(reason, result.realized_output_amount, result.signature)
                    .await
            }
            Err(SwapError::ConfirmTimeout { signature }) => {
                // Never resubmit before knowing what happened to this one
                self.pending_exit = Some(PendingExit {
                    signature,
                    expected_output,
                    reason,
                    recorded_at: Instant::now(),
                });
                self.exit_failed()
            }
            Err(e) => {
                warn!("Sell of {} failed: {}", format_pubkey(&self.token_mint), e);
                self.exit_failed()
            }
        }
    }

    fn exit_failed(&mut self) -> PositionState {
        self.failed_exits += 1;
        let alert_after = self.config.exit_alert_after;
        if alert_after > 0 && self.failed_exits % alert_after == 0 {
            error!(
                "ALERT: {} consecutive failed exits for {}, position still open",
                self.failed_exits,
                format_pubkey(&self.token_mint)
            );
        }
        self.transition(PositionState::Holding);
        self.state
    }

    async fn close(&mut self, reason: ExitReason, exit_amount_out: u64, signature: Signature) -> PositionState {
        let Some(position) = self.position.as_ref() else {
            return self.state;
        };
        let closed = ClosedPosition::from_exit(position, exit_amount_out, reason, signature);
        self.transition(PositionState::Closed);
        self.failed_exits = 0;

        info!(
            "Sold {} for {} ({}), profit {}, tx: {}",
            format_pubkey(&self.token_mint),
            to_ui_amount(exit_amount_out, self.config.quote_decimals),
            reason.as_str(),
            closed.profit,
            signature
        );
        self.services.sink.position_closed(&closed).await;
        self.state
    }

    /// Enter, then poll until the position closes or shutdown is requested.
    ///
    /// The poll timer lives inside this future and is dropped with it.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> PositionState {
        if *shutdown.borrow() {
            return self.state;
        }
        if self.state == PositionState::Open {
            self.enter().await;
        }
        if self.state != PositionState::Holding {
            return self.state;
        }

        let mut ticker = time::interval_at(
            time::Instant::now() + self.config.poll_interval(),
            self.config.poll_interval(),
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await.is_terminal() {
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    if let Some(position) = &self.position {
                        warn!(
                            "Shutting down with {} still open: {} tokens at entry price {:.9}{}",
                            format_pubkey(&self.token_mint),
                            to_ui_amount(position.entry_amount_out, position.token_decimals),
                            position.entry_price(),
                            match &self.pending_exit {
                                Some(pending) => format!(", unresolved sell {}", pending.signature),
                                None => String::new(),
                            }
                        );
                    }
                    break;
                }
            }
        }
        self.state
    }
}
