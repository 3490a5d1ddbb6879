//! Error types shared by the trading pipeline.
//!
//! Everything here is recoverable: steady-state processing logs these and
//! moves on to the next event or tick. Fatal startup failures go through
//! `anyhow` in `main` instead.

use solana_sdk::signature::Signature;
use thiserror::Error;

/// A response did not match the schema we expect.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pubkey: {0}")]
    InvalidPubkey(String),

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("unexpected account layout: {0}")]
    UnexpectedAccount(String),

    #[error("undecodable transaction: {0}")]
    Transaction(String),
}

/// Transient failure talking to the RPC node or an HTTP API.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC request failed: {0}")]
    Rpc(#[from] Box<solana_client::client_error::ClientError>),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Parse(#[from] ParseError),
}

impl From<solana_client::client_error::ClientError> for NetworkError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        NetworkError::Rpc(Box::new(err))
    }
}

/// Failure while turning a route into a confirmed transaction.
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("could not build swap transaction: {0}")]
    Build(String),

    #[error("could not submit swap transaction: {0}")]
    Submit(String),

    #[error("swap {signature} not confirmed in time")]
    ConfirmTimeout { signature: Signature },

    #[error("swap {signature} failed on-chain: {reason}")]
    Failed { signature: Signature, reason: String },
}

/// Price lookups distinguish "no data" from transport or schema failures.
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("no price available for {0}")]
    Missing(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Network(#[from] NetworkError),

    #[error("ledger outbox error: {0}")]
    Outbox(String),
}
