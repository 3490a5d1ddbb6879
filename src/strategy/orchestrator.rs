use log::{debug, error, info, warn};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

use crate::config::Config;
use crate::models::{PoolCreationEvent, PositionState, RiskReason};
use crate::strategy::analysis::{MintMetadataSource, RiskFilter};
use crate::strategy::position_monitor::{PositionMonitor, TradingServices};
use crate::utils::format_pubkey;

/// What happened to a candidate event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Screening (and possibly trading) started in its own task
    Spawned,
    /// A monitor for this mint is already running
    Duplicate,
    /// Every position slot is taken
    AtCapacity,
    /// The pool announced the quote asset itself
    Ignored,
}

/// How a spawned candidate task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    Rejected(RiskReason),
    Finished(PositionState),
}

/// Counters over the orchestrator's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorReport {
    pub candidates: usize,
    pub duplicates: usize,
    pub skipped_at_capacity: usize,
    pub rejected: usize,
    pub closed: usize,
    pub abandoned: usize,
    /// Positions still open when shutdown was requested
    pub interrupted: usize,
    pub crashed: usize,
}

/// Mints with a screening or trading task in flight. Clones share one set.
#[derive(Clone, Default)]
pub struct MintRegistry {
    mints: Arc<Mutex<HashSet<Pubkey>>>,
}

impl MintRegistry {
    fn lock(&self) -> MutexGuard<'_, HashSet<Pubkey>> {
        self.mints.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mints currently in flight, in no particular order
    pub fn snapshot(&self) -> Vec<Pubkey> {
        self.lock().iter().copied().collect()
    }

    fn claim(&self, mint: Pubkey) -> Option<ActiveMint> {
        if !self.lock().insert(mint) {
            return None;
        }
        Some(ActiveMint {
            mint,
            registry: self.clone(),
        })
    }
}

/// Marks a mint as in flight; released when the owning task finishes
struct ActiveMint {
    mint: Pubkey,
    registry: MintRegistry,
}

impl Drop for ActiveMint {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.mint);
    }
}

/// Wires pool events through the risk filter into per-token monitors
pub struct Orchestrator<S> {
    config: Arc<Config>,
    risk: Arc<RiskFilter<S>>,
    services: TradingServices,
    active: MintRegistry,
    slots: Arc<Semaphore>,
    monitors: JoinSet<(Pubkey, MonitorOutcome)>,
    shutdown: watch::Receiver<bool>,
    report: OrchestratorReport,
}

impl<S: MintMetadataSource + 'static> Orchestrator<S> {
    pub fn new(
        config: Arc<Config>,
        risk: RiskFilter<S>,
        services: TradingServices,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(config.max_concurrent_positions));
        Self {
            config,
            risk: Arc::new(risk),
            services,
            active: MintRegistry::default(),
            slots,
            monitors: JoinSet::new(),
            shutdown,
            report: OrchestratorReport::default(),
        }
    }

    /// Number of candidates currently being screened or traded
    pub fn active_count(&self) -> usize {
        self.monitors.len()
    }

    /// Shared view of the in-flight mints, still readable after `run` consumes self
    pub fn registry(&self) -> MintRegistry {
        self.active.clone()
    }

    /// Start handling one candidate without waiting on any network call
    pub fn dispatch(&mut self, event: PoolCreationEvent) -> Dispatch {
        let mint = event.discovered_token_mint;
        self.report.candidates += 1;

        if mint == self.config.quote_mint {
            return Dispatch::Ignored;
        }

        let Some(claim) = self.active.claim(mint) else {
            debug!("Already tracking {}, ignoring event {}", format_pubkey(&mint), event.signature);
            self.report.duplicates += 1;
            return Dispatch::Duplicate;
        };

        let permit = match self.slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    "All {} position slots busy, skipping {}",
                    self.config.max_concurrent_positions,
                    format_pubkey(&mint)
                );
                self.report.skipped_at_capacity += 1;
                return Dispatch::AtCapacity;
            }
        };

        info!("New pool candidate {} (tx {})", format_pubkey(&mint), event.signature);
        let risk = self.risk.clone();
        let config = self.config.clone();
        let services = self.services.clone();
        let shutdown = self.shutdown.clone();
        self.monitors
            .spawn(Self::screen_and_trade(mint, risk, config, services, shutdown, claim, permit));
        Dispatch::Spawned
    }

    async fn screen_and_trade(
        mint: Pubkey,
        risk: Arc<RiskFilter<S>>,
        config: Arc<Config>,
        services: TradingServices,
        shutdown: watch::Receiver<bool>,
        _claim: ActiveMint,
        _permit: OwnedSemaphorePermit,
    ) -> (Pubkey, MonitorOutcome) {
        let verdict = risk.screen(&mint).await;
        if !verdict.accepted {
            return (mint, MonitorOutcome::Rejected(verdict.reason));
        }

        let monitor = PositionMonitor::new(mint, verdict.decimals.unwrap_or_default(), config, services);
        (mint, MonitorOutcome::Finished(monitor.run(shutdown).await))
    }

    fn record(&mut self, joined: Result<(Pubkey, MonitorOutcome), JoinError>) {
        match joined {
            Ok((_, MonitorOutcome::Rejected(_))) => self.report.rejected += 1,
            Ok((mint, MonitorOutcome::Finished(state))) => {
                match state {
                    PositionState::Closed => self.report.closed += 1,
                    PositionState::Abandoned => self.report.abandoned += 1,
                    _ => self.report.interrupted += 1,
                }
                debug!("Monitor for {} finished in state {}", format_pubkey(&mint), state);
            }
            Err(e) => {
                error!("Monitor task crashed: {}", e);
                self.report.crashed += 1;
            }
        }
    }

    /// Consume events until the channel closes or shutdown is requested, then
    /// wait for every monitor to wind down.
    pub async fn run(mut self, mut events: mpsc::Receiver<PoolCreationEvent>) -> OrchestratorReport {
        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.dispatch(event);
                    }
                    None => {
                        info!("Pool event stream ended");
                        break;
                    }
                },
                Some(joined) = self.monitors.join_next(), if !self.monitors.is_empty() => self.record(joined),
                _ = shutdown.changed() => {
                    info!("Shutdown requested, waiting for {} monitors", self.monitors.len());
                    break;
                }
            }
        }

        // Monitors watch the same shutdown signal and stop at their next await point
        while let Some(joined) = self.monitors.join_next().await {
            self.record(joined);
        }
        self.report
    }
}
