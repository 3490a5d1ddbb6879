mod types;

pub use types::load_config;
pub use types::Config;
pub use types::LedgerConfig;
pub use types::{RAYDIUM_PROGRAM_ID, WSOL_MINT};
