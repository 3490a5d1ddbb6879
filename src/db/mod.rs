mod sqlite;

pub use sqlite::{Database, PendingLedgerDelta, TradeSummary};
