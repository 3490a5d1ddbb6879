use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Wrapped SOL, the default quote asset
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Raydium program watched for pool creation logs
pub const RAYDIUM_PROGRAM_ID: &str = "RVKd61ztZW9ekMSCJaoN96D2YzNhztsh5dz7ie1C6u3";

/// Slack on top of the confirm windows for quote and swap-build requests
const SHUTDOWN_MARGIN: Duration = Duration::from_secs(30);

/// Configuration for the pool sniper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Solana RPC URL
    pub rpc_url: String,
    /// Solana websocket URL used for the log subscription
    pub ws_url: String,
    /// Wallet keypair path
    pub keypair_path: String,
    /// Inline secret key (JSON byte array or base58), takes precedence over the file
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
    /// Asset we buy with and sell back into
    pub quote_mint: Pubkey,
    /// Decimals of the quote asset
    pub quote_decimals: u8,
    /// Amount of quote asset spent per trade, in raw units
    pub quote_amount: u64,
    /// Exit once price / entry price reaches this ratio
    pub take_profit: f64,
    /// Exit once price / entry price falls to this ratio
    pub stop_loss: f64,
    /// Minimum raw token supply for a candidate to be tradable
    pub liquidity_threshold: u64,
    /// Program whose logs announce new pools
    pub program_id: Pubkey,
    /// Slippage tolerance passed to the aggregator
    pub slippage_bps: u16,
    /// How often an open position polls its price
    pub poll_interval_seconds: u64,
    /// How long to wait for a swap to confirm
    pub confirm_timeout_seconds: u64,
    /// Upper bound on simultaneously monitored positions
    pub max_concurrent_positions: usize,
    /// Raise an alert every this many consecutive failed exits
    pub exit_alert_after: u32,
    /// Jupiter quote/swap API base URL
    pub jupiter_quote_api: String,
    /// Jupiter price API URL
    pub jupiter_price_api: String,
    /// SQLite database path
    pub database_path: String,
    /// Remote balance ledger, disabled when absent
    pub ledger: Option<LedgerConfig>,
}

/// Connection details for the remote balance ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            ws_url: "wss://api.mainnet-beta.solana.com".to_string(),
            keypair_path: "keypair.json".to_string(),
            private_key: None,
            quote_mint: Pubkey::from_str(WSOL_MINT).unwrap_or_default(),
            quote_decimals: 9,
            quote_amount: 0,
            take_profit: 1.25,
            stop_loss: 0.8,
            liquidity_threshold: 1000,
            program_id: Pubkey::from_str(RAYDIUM_PROGRAM_ID).unwrap_or_default(),
            slippage_bps: 100, // 1%
            poll_interval_seconds: 10,
            confirm_timeout_seconds: 60,
            max_concurrent_positions: 10,
            exit_alert_after: 5,
            jupiter_quote_api: "https://quote-api.jup.ag/v6".to_string(),
            jupiter_price_api: "https://price.jup.ag/v4/price".to_string(),
            database_path: "sniper.db".to_string(),
            ledger: None,
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_seconds)
    }

    /// How long shutdown waits for monitors to wind down.
    ///
    /// A buy caught mid-flight may spend one confirm window on the swap and a
    /// second one waiting for a late landing, plus the aggregator round trips.
    pub fn shutdown_grace(&self) -> Duration {
        self.confirm_timeout() * 2 + SHUTDOWN_MARGIN
    }

    /// Reject parameter combinations that would make the bot trade nonsensically
    pub fn validate(&self) -> Result<()> {
        if self.quote_amount == 0 {
            bail!("QUOTE_AMOUNT must be greater than zero");
        }
        if !(self.take_profit > 1.0) {
            bail!("TAKE_PROFIT must be above 1.0, got {}", self.take_profit);
        }
        if !(self.stop_loss > 0.0 && self.stop_loss < 1.0) {
            bail!("STOP_LOSS must be between 0 and 1, got {}", self.stop_loss);
        }
        if !(1..=5000).contains(&self.slippage_bps) {
            bail!("SLIPPAGE_BPS must be between 1 and 5000, got {}", self.slippage_bps);
        }
        if self.poll_interval_seconds == 0 {
            bail!("POLL_INTERVAL_SECONDS must be greater than zero");
        }
        if self.confirm_timeout_seconds == 0 {
            bail!("CONFIRM_TIMEOUT_SECONDS must be greater than zero");
        }
        if self.max_concurrent_positions == 0 {
            bail!("MAX_CONCURRENT_POSITIONS must be greater than zero");
        }
        if self.quote_decimals > 18 {
            bail!("QUOTE_DECIMALS is out of range: {}", self.quote_decimals);
        }
        Ok(())
    }
}

/// Parse an optional environment variable, failing loudly on malformed values
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: {}", name, raw)),
        Err(_) => Ok(None),
    }
}

/// Loads configuration from environment variables, falling back to default values
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    if let Ok(rpc_url) = env::var("RPC_URL") {
        config.rpc_url = rpc_url;
    }

    // Derive the websocket endpoint from the HTTP one unless given explicitly
    config.ws_url = match env::var("RPC_WEBSOCKET_URL") {
        Ok(ws_url) => ws_url,
        Err(_) => config.rpc_url.replacen("http", "ws", 1),
    };

    if let Ok(keypair_path) = env::var("KEYPAIR_PATH") {
        config.keypair_path = keypair_path;
    }

    config.private_key = env::var("PRIVATE_KEY").ok();

    if let Some(value) = env_parse::<Pubkey>("QUOTE_MINT")? {
        config.quote_mint = value;
    }
    if let Some(value) = env_parse::<u8>("QUOTE_DECIMALS")? {
        config.quote_decimals = value;
    }
    if let Some(value) = env_parse::<u64>("QUOTE_AMOUNT")? {
        config.quote_amount = value;
    }
    if let Some(value) = env_parse::<f64>("TAKE_PROFIT")? {
        config.take_profit = value;
    }
    if let Some(value) = env_parse::<f64>("STOP_LOSS")? {
        config.stop_loss = value;
    }
    if let Some(value) = env_parse::<u64>("LP_THRESHOLD")? {
        config.liquidity_threshold = value;
    }
    if let Some(value) = env_parse::<Pubkey>("RAYDIUM_PROGRAM_ID")? {
        config.program_id = value;
    }
    if let Some(value) = env_parse::<u16>("SLIPPAGE_BPS")? {
        config.slippage_bps = value;
    }
    if let Some(value) = env_parse::<u64>("POLL_INTERVAL_SECONDS")? {
        config.poll_interval_seconds = value;
    }
    if let Some(value) = env_parse::<u64>("CONFIRM_TIMEOUT_SECONDS")? {
        config.confirm_timeout_seconds = value;
    }
    if let Some(value) = env_parse::<usize>("MAX_CONCURRENT_POSITIONS")? {
        config.max_concurrent_positions = value;
    }
    if let Some(value) = env_parse::<u32>("EXIT_ALERT_AFTER")? {
        config.exit_alert_after = value;
    }

    if let Ok(url) = env::var("JUPITER_QUOTE_API") {
        config.jupiter_quote_api = url.trim_end_matches('/').to_string();
    }
    if let Ok(url) = env::var("JUPITER_PRICE_API") {
        config.jupiter_price_api = url;
    }
    if let Ok(path) = env::var("DATABASE_PATH") {
        config.database_path = path;
    }

    config.ledger = match (env::var("SUPABASE_URL"), env::var("SUPABASE_ANON_KEY")) {
        (Ok(url), Ok(api_key)) => Some(LedgerConfig {
            url: url.trim_end_matches('/').to_string(),
            api_key,
        }),
        _ => None,
    };

    Ok(config)
}
