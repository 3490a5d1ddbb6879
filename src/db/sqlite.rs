use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::models::ClosedPosition;

/// A ledger delta that has not reached the remote ledger yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLedgerDelta {
    pub id: i64,
    pub wallet: String,
    pub delta: i64,
    pub attempts: i64,
}

/// Aggregate over closed trades
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TradeSummary {
    pub closed: i64,
    pub abandoned: i64,
    pub total_profit: i64,
}

/// Database manager for the trade journal and the ledger outbox
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `database_url`
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");

        let options = if database_url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(database_url)?
        } else {
            SqliteConnectOptions::new().filename(database_url)
        }
        .create_if_missing(true);

        // Every connection to an in-memory database sees its own empty database
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token_mint TEXT NOT NULL,
                state TEXT NOT NULL,
                entry_amount_in INTEGER,
                entry_amount_out INTEGER,
                exit_amount_out INTEGER,
                profit INTEGER,
                exit_reason TEXT,
                entry_signature TEXT,
                exit_signature TEXT,
                note TEXT,
                opened_at TEXT,
                closed_at TEXT NOT NULL
            )"
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS ledger_outbox (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wallet TEXT NOT NULL,
                delta INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                delivered_at TEXT
            )"
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Journal a position that was sold
    pub async fn record_closed(&self, closed: &ClosedPosition) -> Result<()> {
        sqlx::query(
            "INSERT INTO trades (
                token_mint, state, entry_amount_in, entry_amount_out, exit_amount_out,
                profit, exit_reason, entry_signature, exit_signature, opened_at, closed_at
            ) VALUES (?, 'closed', ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(closed.token_mint.to_string())
        .bind(closed.entry_amount_in as i64)
        .bind(closed.entry_amount_out as i64)
        .bind(closed.exit_amount_out as i64)
        .bind(closed.profit)
        .bind(closed.exit_reason.as_str())
        .bind(closed.entry_signature.to_string())
        .bind(closed.exit_signature.to_string())
        .bind(closed.opened_at.to_rfc3339())
        .bind(closed.closed_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Journal a candidate whose entry never completed
    pub async fn record_abandoned(&self, token_mint: &Pubkey, note: &str) -> Result<()> {
        sqlx::query("INSERT INTO trades (token_mint, state, note, closed_at) VALUES (?, 'abandoned', ?, ?)")
            .bind(token_mint.to_string())
            .bind(note)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn trade_summary(&self) -> Result<TradeSummary> {
        let (closed, abandoned, total_profit): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                COALESCE(SUM(state = 'closed'), 0),
                COALESCE(SUM(state = 'abandoned'), 0),
                COALESCE(SUM(profit), 0)
            FROM trades"
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TradeSummary { closed, abandoned, total_profit })
    }

    /// Queue a balance delta for the remote ledger, returning its outbox id
    pub async fn enqueue_ledger_delta(&self, wallet: &str, delta: i64) -> Result<i64> {
        let result = sqlx::query("INSERT INTO ledger_outbox (wallet, delta, created_at) VALUES (?, ?, ?)")
            .bind(wallet)
            .bind(delta)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// Oldest undelivered deltas first
    pub async fn pending_ledger_deltas(&self, limit: i64) -> Result<Vec<PendingLedgerDelta>> {
        let rows: Vec<(i64, String, i64, i64)> = sqlx::query_as(
            "SELECT id, wallet, delta, attempts FROM ledger_outbox
            WHERE delivered_at IS NULL
            ORDER BY id
            LIMIT ?"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, wallet, delta, attempts)| PendingLedgerDelta { id, wallet, delta, attempts })
            .collect())
    }

    pub async fn mark_ledger_delivered(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE ledger_outbox SET delivered_at = ?, attempts = attempts + 1 WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn record_ledger_failure(&self, id: i64, error: &str) -> Result<()> {
        sqlx::query("UPDATE ledger_outbox SET attempts = attempts + 1, last_error = ? WHERE id = ?")
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Initialize an in-memory database for testing
#[cfg(test)]
pub async fn init_test_db() -> Result<Database> {
    Database::new("sqlite::memory:").await
}
