use anyhow::Result;
use crate::models::PoolCreationEvent;
use tokio::sync::mpsc;

/// Trait for sources of newly created pools
pub trait PoolMonitor {
    /// Start monitoring for new pools, forwarding each candidate to `tx`
    async fn start_monitoring(&mut self, tx: mpsc::Sender<PoolCreationEvent>) -> Result<()>;

    /// Stop monitoring
    async fn stop(&mut self) -> Result<()>;
}
