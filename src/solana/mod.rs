pub mod client;
pub mod rpc_helpers;
pub mod wallet;

pub use client::SolanaClient;
pub use rpc_helpers::*;
pub use wallet::Wallet;

use crate::config::Config;
use anyhow::{Context, Result};

/// Create a Solana client from the application configuration
pub fn create_client_from_config(config: &Config) -> SolanaClient {
    SolanaClient::new(&config.rpc_url)
}

/// Load the trading wallet, preferring an inline secret over the keypair file
pub fn load_wallet_from_config(config: &Config) -> Result<Wallet> {
    match &config.private_key {
        Some(secret) => Wallet::from_secret(secret).context("Failed to parse PRIVATE_KEY"),
        None => Wallet::from_file(&config.keypair_path)
            .with_context(|| format!("Failed to load wallet from {}", config.keypair_path)),
    }
}
