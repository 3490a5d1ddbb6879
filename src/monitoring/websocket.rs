use anyhow::{anyhow, Result};
use futures::StreamExt;
use log::{debug, error, info, warn};
use regex::Regex;
use solana_client::nonblocking::pubsub_client::PubsubClient;
use solana_client::rpc_config::{RpcTransactionLogsConfig, RpcTransactionLogsFilter};
use solana_client::rpc_response::RpcLogsResponse;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::errors::ParseError;
use crate::models::PoolCreationEvent;
use crate::monitoring::pool_monitor::PoolMonitor;
use crate::utils::format_pubkey;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

fn mint_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)mint\s*:\s*([0-9A-Za-z]+)").expect("mint pattern is valid"))
}

/// Find the token mint announced in a batch of program logs.
///
/// Only the first line matching `mint: <address>` is considered, including
/// prefixed fields such as `base_mint:`; if its capture is not a valid pubkey
/// the whole batch is rejected.
pub fn extract_token_mint(logs: &[String]) -> Result<Option<Pubkey>, ParseError> {
    let Some(captures) = logs.iter().find_map(|line| mint_pattern().captures(line)) else {
        return Ok(None);
    };
    let candidate = &captures[1];
    Pubkey::from_str(candidate)
        .map(Some)
        .map_err(|_| ParseError::InvalidPubkey(candidate.to_string()))
}

/// Why a single subscription ended
enum SubscriptionEnd {
    Shutdown,
    ReceiverGone,
    StreamClosed,
}

/// Watches a program's log stream over websocket for pool creations
pub struct LogPoolListener {
    ws_url: String,
    program_id: Pubkey,
    commitment: CommitmentConfig,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl LogPoolListener {
    /// Create a new listener for `program_id`
    pub fn new(ws_url: &str, program_id: Pubkey) -> Self {
        Self {
            ws_url: ws_url.to_string(),
            program_id,
            commitment: CommitmentConfig::confirmed(),
            shutdown: None,
            handle: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.ws_url, config.program_id)
    }

    /// Turn one log notification into a candidate, if it announces a mint
    fn handle_logs(logs: RpcLogsResponse) -> Option<PoolCreationEvent> {
        if logs.err.is_some() {
            debug!("Skipping failed transaction {}", logs.signature);
            return None;
        }

        match extract_token_mint(&logs.logs) {
            Ok(Some(mint)) => {
                debug!("Found mint {} in {}", format_pubkey(&mint), logs.signature);
                Some(PoolCreationEvent::new(mint, logs.logs, logs.signature))
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Discarding logs of {}: {}", logs.signature, e);
                None
            }
        }
    }

    async fn subscribe_once(
        ws_url: &str,
        program_id: &Pubkey,
        commitment: CommitmentConfig,
        tx: &mpsc::Sender<PoolCreationEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<SubscriptionEnd> {
        let client = PubsubClient::new(ws_url)
            .await
            .map_err(|e| anyhow!("websocket connect to {} failed: {}", ws_url, e))?;
        let (mut stream, unsubscribe) = client
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![program_id.to_string()]),
                RpcTransactionLogsConfig { commitment: Some(commitment) },
            )
            .await
            .map_err(|e| anyhow!("logs subscription failed: {}", e))?;
        info!("Subscribed to logs of program {}", program_id);

        let end = loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(response) => {
                        if let Some(event) = Self::handle_logs(response.value) {
                            if tx.send(event).await.is_err() {
                                break SubscriptionEnd::ReceiverGone;
                            }
                        }
                    }
                    None => break SubscriptionEnd::StreamClosed,
                },
                _ = shutdown.changed() => break SubscriptionEnd::Shutdown,
            }
        };

        unsubscribe().await;
        drop(stream);
        if let Err(e) = client.shutdown().await {
            debug!("Websocket shutdown error: {}", e);
        }
        Ok(end)
    }

    /// Keep a subscription alive until shutdown, reconnecting whenever it drops
    async fn run(
        ws_url: String,
        program_id: Pubkey,
        commitment: CommitmentConfig,
        tx: mpsc::Sender<PoolCreationEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match Self::subscribe_once(&ws_url, &program_id, commitment, &tx, &mut shutdown).await {
                Ok(SubscriptionEnd::Shutdown) | Ok(SubscriptionEnd::ReceiverGone) => break,
                Ok(SubscriptionEnd::StreamClosed) => warn!("Log stream closed, reconnecting in {:?}", RECONNECT_DELAY),
                Err(e) => error!("{}, retrying in {:?}", e, RECONNECT_DELAY),
            }

            tokio::select! {
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("Pool log listener stopped");
    }
}

impl PoolMonitor for LogPoolListener {
    async fn start_monitoring(&mut self, tx: mpsc::Sender<PoolCreationEvent>) -> Result<()> {
        if self.handle.is_some() {
            return Err(anyhow!("Pool log listener already running"));
        }
        info!("Starting pool monitoring via Solana websocket ({})...", self.ws_url);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Self::run(
            self.ws_url.clone(),
            self.program_id,
            self.commitment,
            tx,
            shutdown_rx,
        ));

        self.shutdown = Some(shutdown_tx);
        self.handle = Some(handle);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        info!("Stopping pool monitoring...");
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(handle) = self.handle.take() {
            handle.await?;
        }
        Ok(())
    }
}
