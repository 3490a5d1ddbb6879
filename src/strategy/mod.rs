pub mod analysis;
pub mod orchestrator;
pub mod position_monitor;

pub use analysis::{MintMetadataSource, RiskFilter};
pub use orchestrator::{Dispatch, MintRegistry, MonitorOutcome, Orchestrator, OrchestratorReport};
pub use position_monitor::{evaluate_exit, PositionMonitor, TradingServices};
