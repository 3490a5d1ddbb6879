pub mod pool;
mod position;
mod risk;
mod swap;

pub use pool::PoolCreationEvent;
pub use position::{ClosedPosition, ExitReason, Position, PositionState};
pub use risk::{MintMetadata, RiskReason, RiskVerdict};
pub use swap::{SignatureState, SwapQuoteRoute, SwapResult};
