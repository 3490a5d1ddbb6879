//! Reporting finished positions to the outside world.
//!
//! Every closed trade goes to the local journal first; the balance delta is
//! then pushed to the remote ledger through an outbox, so a ledger outage only
//! delays bookkeeping and never touches trading.

mod supabase;

pub use supabase::SupabaseLedger;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::db::{Database, PendingLedgerDelta};
use crate::errors::LedgerError;
use crate::models::ClosedPosition;
use crate::utils::format_pubkey;

const FLUSH_BATCH: i64 = 50;

/// Remote balance bookkeeping
#[async_trait]
pub trait BalanceLedger: Send + Sync {
    async fn increment_balance(&self, wallet: &str, delta: i64) -> Result<(), LedgerError>;
}

/// Receives the outcome of every monitored position.
///
/// Implementations must not fail the caller: trading has already happened.
#[async_trait]
pub trait PositionSink: Send + Sync {
    async fn position_closed(&self, closed: &ClosedPosition);

    async fn position_abandoned(&self, _token_mint: &Pubkey, _reason: &str) {}
}

/// Journals outcomes and forwards profit to the ledger with at-least-once delivery
pub struct LedgerReporter {
    db: Database,
    ledger: Option<Arc<dyn BalanceLedger>>,
    wallet: String,
}

impl LedgerReporter {
    pub fn new(db: Database, ledger: Option<Arc<dyn BalanceLedger>>, wallet: &Pubkey) -> Self {
        Self {
            db,
            ledger,
            wallet: wallet.to_string(),
        }
    }

    async fn deliver(&self, ledger: &dyn BalanceLedger, pending: &PendingLedgerDelta) -> Result<(), LedgerError> {
        match ledger.increment_balance(&pending.wallet, pending.delta).await {
            Ok(()) => {
                self.db.mark_ledger_delivered(pending.id).await.map_err(to_db_error)?;
                debug!("Ledger delta #{} ({}) delivered", pending.id, pending.delta);
                Ok(())
            }
            Err(e) => {
                if let Err(db_err) = self.db.record_ledger_failure(pending.id, &e.to_string()).await {
                    error!("Failed to record ledger failure for #{}: {}", pending.id, db_err);
                }
                Err(e)
            }
        }
    }

    /// Retry every undelivered delta once, returning how many went through
    pub async fn flush_pending(&self) -> Result<usize, LedgerError> {
        let Some(ledger) = &self.ledger else {
            return Ok(0);
        };

        let pending = self.db.pending_ledger_deltas(FLUSH_BATCH).await.map_err(to_db_error)?;
        let mut delivered = 0;
        for delta in &pending {
            match self.deliver(ledger.as_ref(), delta).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Ledger still unreachable ({} attempts for #{}): {}", delta.attempts + 1, delta.id, e);
                    // Stay in order; the rest will most likely fail the same way
                    break;
                }
            }
        }
        Ok(delivered)
    }

    /// Periodically flush the outbox until shutdown is signalled
    pub fn start_flush_task(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                // Jitter so a recovering ledger is not hit in lockstep
                let jitter = Duration::from_millis(fastrand::u64(0..1_000));
                tokio::select! {
                    _ = tokio::time::sleep(interval + jitter) => {}
                    _ = shutdown.changed() => break,
                }

                match self.flush_pending().await {
                    Ok(0) => {}
                    Ok(n) => info!("Flushed {} pending ledger deltas", n),
                    Err(e) => warn!("Ledger flush failed: {}", e),
                }
            }
            debug!("Ledger flush task stopped");
        })
    }
}

#[async_trait]
impl PositionSink for LedgerReporter {
    async fn position_closed(&self, closed: &ClosedPosition) {
        if let Err(e) = self.db.record_closed(closed).await {
            error!("Failed to journal closed position {}: {}", format_pubkey(&closed.token_mint), e);
        }

        let Some(ledger) = &self.ledger else {
            info!("Ledger disabled, profit {} for {} journaled locally only", closed.profit, format_pubkey(&closed.token_mint));
            return;
        };

        let id = match self.db.enqueue_ledger_delta(&self.wallet, closed.profit).await {
            Ok(id) => id,
            Err(e) => {
                // No outbox row means no retry; push once directly
                error!("Failed to queue ledger delta: {}", e);
                if let Err(e) = ledger.increment_balance(&self.wallet, closed.profit).await {
                    error!("Ledger update of {} lost: {}", closed.profit, e);
                }
                return;
            }
        };

        let pending = PendingLedgerDelta {
            id,
            wallet: self.wallet.clone(),
            delta: closed.profit,
            attempts: 0,
        };
        if let Err(e) = self.deliver(ledger.as_ref(), &pending).await {
            warn!("Ledger update #{} deferred: {}", id, e);
        }
    }

    async fn position_abandoned(&self, token_mint: &Pubkey, reason: &str) {
        if let Err(e) = self.db.record_abandoned(token_mint, reason).await {
            error!("Failed to journal abandoned candidate {}: {}", format_pubkey(token_mint), e);
        }
    }
}

fn to_db_error(err: anyhow::Error) -> LedgerError {
    LedgerError::Outbox(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::NetworkError;
    use crate::models::{ExitReason, Position};
    use chrono::Utc;
    use solana_sdk::signature::Signature;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakyLedger {
        down: AtomicBool,
        received: Mutex<Vec<(String, i64)>>,
    }

    #[async_trait]
    impl BalanceLedger for FlakyLedger {
        async fn increment_balance(&self, wallet: &str, delta: i64) -> Result<(), LedgerError> {
            if self.down.load(Ordering::SeqCst) {
                return Err(NetworkError::Status { status: 503, body: "down".to_string() }.into());
            }
            self.received.lock().unwrap().push((wallet.to_string(), delta));
            Ok(())
        }
    }

    fn closed(exit_out: u64) -> ClosedPosition {
        let position = Position {
            token_mint: Pubkey::new_unique(),
            entry_amount_in: 100,
            entry_amount_out: 200,
            token_decimals: 9,
            quote_decimals: 9,
            entry_signature: Signature::default(),
            opened_at: Utc::now(),
        };
        ClosedPosition::from_exit(&position, exit_out, ExitReason::StopLoss, Signature::default())
    }

    #[tokio::test]
    async fn profit_is_forwarded_to_the_ledger() {
        let db = crate::db::Database::new("sqlite::memory:").await.unwrap();
        let ledger = Arc::new(FlakyLedger::default());
        let wallet = Pubkey::new_unique();
        let reporter = LedgerReporter::new(db.clone(), Some(ledger.clone() as Arc<dyn BalanceLedger>), &wallet);

        reporter.position_closed(&closed(75)).await;

        assert_eq!(*ledger.received.lock().unwrap(), vec![(wallet.to_string(), -25)]);
        assert!(db.pending_ledger_deltas(10).await.unwrap().is_empty());
        assert_eq!(db.trade_summary().await.unwrap().closed, 1);
    }

    #[tokio::test]
    async fn ledger_outage_is_retried_from_the_outbox() {
        let db = crate::db::Database::new("sqlite::memory:").await.unwrap();
        let ledger = Arc::new(FlakyLedger::default());
        ledger.down.store(true, Ordering::SeqCst);
        let wallet = Pubkey::new_unique();
        let reporter = LedgerReporter::new(db.clone(), Some(ledger.clone() as Arc<dyn BalanceLedger>), &wallet);

        reporter.position_closed(&closed(150)).await;
        assert!(ledger.received.lock().unwrap().is_empty());
        assert_eq!(db.pending_ledger_deltas(10).await.unwrap().len(), 1);

        assert_eq!(reporter.flush_pending().await.unwrap(), 0);

        ledger.down.store(false, Ordering::SeqCst);
        assert_eq!(reporter.flush_pending().await.unwrap(), 1);
        assert_eq!(*ledger.received.lock().unwrap(), vec![(wallet.to_string(), 50)]);
        assert!(db.pending_ledger_deltas(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_ledger_still_journals() {
        let db = crate::db::Database::new("sqlite::memory:").await.unwrap();
        let reporter = LedgerReporter::new(db.clone(), None, &Pubkey::new_unique());

        reporter.position_closed(&closed(120)).await;
        reporter.position_abandoned(&Pubkey::new_unique(), "no buy route").await;

        let summary = db.trade_summary().await.unwrap();
        assert_eq!((summary.closed, summary.abandoned, summary.total_profit), (1, 1, 20));
        assert!(db.pending_ledger_deltas(10).await.unwrap().is_empty());
    }
}
