use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use raydium_pool_sniper::config;
use raydium_pool_sniper::db::Database;
use raydium_pool_sniper::jupiter::{JupiterClient, JupiterSwapExecutor};
use raydium_pool_sniper::ledger::{BalanceLedger, LedgerReporter, SupabaseLedger};
use raydium_pool_sniper::models::PoolCreationEvent;
use raydium_pool_sniper::monitoring::{LogPoolListener, PoolMonitor};
use raydium_pool_sniper::solana;
use raydium_pool_sniper::strategy::{Orchestrator, RiskFilter, TradingServices};
use raydium_pool_sniper::utils::{format_pubkey, lamports_to_sol};

const EVENT_CHANNEL_CAPACITY: usize = 100;
const LEDGER_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "raydium-pool-sniper", about = "Snipes new Raydium pools through Jupiter")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Override DATABASE_PATH
    #[arg(long)]
    database: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize environment variables
    match &cli.env_file {
        Some(path) => {
            dotenv::from_path(path).with_context(|| format!("Failed to read {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    init_logger();
    info!("Starting Raydium pool sniper...");

    let mut config = config::load_config()?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }
    config.validate()?;
    let config = Arc::new(config);
    info!(
        "Configuration loaded: {} raw units per trade, take profit x{}, stop loss x{}",
        config.quote_amount, config.take_profit, config.stop_loss
    );

    let wallet = Arc::new(solana::load_wallet_from_config(&config)?);
    info!("Wallet loaded with pubkey: {}", wallet.pubkey());

    let solana_client = solana::create_client_from_config(&config);
    match solana_client.get_slot().await {
        Ok(slot) => info!("Current Solana slot: {} - RPC connection established", slot),
        Err(e) => {
            error!("Failed to connect to Solana RPC: {}", e);
            return Err(anyhow::anyhow!("Could not establish Solana RPC connection"));
        }
    }

    let balance = solana_client.get_balance(&wallet.pubkey()).await?;
    info!("Wallet balance: {} SOL", lamports_to_sol(balance));
    if balance == 0 {
        warn!("Wallet holds no SOL, swaps will fail until it is funded");
    }

    let db = Database::new(&config.database_path).await?;
    info!("Database initialized at {}", config.database_path);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ledger = match &config.ledger {
        Some(ledger_config) => {
            info!("Reporting profits to {}", ledger_config.url);
            Some(Arc::new(SupabaseLedger::new(ledger_config)?) as Arc<dyn BalanceLedger>)
        }
        None => {
            info!("Remote ledger disabled (SUPABASE_URL / SUPABASE_ANON_KEY not set)");
            None
        }
    };
    let reporter = Arc::new(LedgerReporter::new(db.clone(), ledger, &wallet.pubkey()));
    let flush_handle = reporter.clone().start_flush_task(LEDGER_FLUSH_INTERVAL, shutdown_rx.clone());

    let jupiter = Arc::new(JupiterClient::from_config(&config)?);
    let executor = JupiterSwapExecutor::new(
        jupiter.clone(),
        solana_client.clone(),
        wallet.clone(),
        config.confirm_timeout(),
    );
    let services = TradingServices {
        quoter: jupiter.clone(),
        executor: Arc::new(executor),
        prices: jupiter,
        sink: reporter,
    };

    let risk = RiskFilter::new(solana_client, config.liquidity_threshold);
    let orchestrator = Orchestrator::new(config.clone(), risk, services, shutdown_rx);
    let in_flight = orchestrator.registry();

    let (event_tx, event_rx) = mpsc::channel::<PoolCreationEvent>(EVENT_CHANNEL_CAPACITY);
    let orchestrator_handle = tokio::spawn(orchestrator.run(event_rx));

    let mut listener = LogPoolListener::from_config(&config);
    listener.start_monitoring(event_tx).await?;
    info!("Listening for new pools on program {}", config.program_id);

    // Wait for Ctrl+C signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Err(e) = listener.stop().await {
        warn!("Pool listener did not stop cleanly: {}", e);
    }

    let grace = config.shutdown_grace();
    match tokio::time::timeout(grace, orchestrator_handle).await {
        Ok(Ok(report)) => info!("Orchestrator finished: {:?}", report),
        Ok(Err(e)) => error!("Orchestrator task failed: {}", e),
        Err(_) => {
            warn!("Orchestrator did not finish within {:?}", grace);
            for mint in in_flight.snapshot() {
                warn!("{} still in flight at exit, check the wallet for an open position", format_pubkey(&mint));
            }
        }
    }
    let _ = tokio::time::timeout(LEDGER_FLUSH_INTERVAL, flush_handle).await;

    match db.trade_summary().await {
        Ok(summary) => info!(
            "Session totals: {} closed, {} abandoned, profit {} raw units",
            summary.closed, summary.abandoned, summary.total_profit
        ),
        Err(e) => warn!("Could not read trade summary: {}", e),
    }

    info!("Shutting down...");
    Ok(())
}

fn init_logger() {
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));
}
