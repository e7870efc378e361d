use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, DatabaseError};
use crate::traits::TaskResult;

/// One transfer attempt as written to `transfer_log`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub wallet_address: String,
    pub recipient: String,
    pub lamports: u64,
    /// `SENT`, `INSUFFICIENT` or `FAILED`.
    pub outcome: String,
    pub signature: Option<String>,
    pub message: String,
    pub duration_ms: u64,
}

/// Aggregates for one wallet across all batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferTotals {
    pub attempts: u64,
    pub sent: u64,
    pub lamports_sent: u64,
}

/// SQLite history of transfers and daily-operation tasks.
#[derive(Debug)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;
    pub const DEFAULT_TIMEOUT_MS: u64 = 30000;

    pub async fn new(db_path: &str) -> Result<Self> {
        if !Path::new(db_path).exists() {
            std::fs::File::create(db_path).map_err(|e| ConfigError::IoError {
                path: db_path.to_string(),
                msg: e.to_string(),
            })?;
            info!("Created new database file: {}", db_path);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(Self::DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_millis(Self::DEFAULT_TIMEOUT_MS))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode=WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA synchronous=NORMAL;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(&format!("sqlite://{}", db_path))
            .await
            .map_err(|e| DatabaseError::OpenFailed {
                path: db_path.to_string(),
                msg: e.to_string(),
            })?;

        let manager = Self { pool };
        manager.init_schema().await?;
        info!("Database {} ready (WAL mode)", db_path);
        Ok(manager)
    }

    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS transfer_log (
                id INTEGER PRIMARY KEY,
                wallet_address TEXT NOT NULL,
                recipient TEXT NOT NULL,
                lamports INTEGER NOT NULL,
                outcome TEXT NOT NULL,
                signature TEXT,
                message TEXT,
                duration_ms INTEGER,
                timestamp INTEGER
            );",
            "CREATE TABLE IF NOT EXISTS task_metrics (
                id INTEGER PRIMARY KEY,
                wallet_address TEXT,
                task_name TEXT,
                status TEXT,
                message TEXT,
                tx_hash TEXT,
                timestamp INTEGER
            );",
            "CREATE INDEX IF NOT EXISTS idx_transfer_log_wallet ON transfer_log(wallet_address);",
            "CREATE INDEX IF NOT EXISTS idx_task_metrics_wallet ON task_metrics(wallet_address);",
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationFailed { msg: e.to_string() })?;
        }

        debug!("Database schema initialized.");
        Ok(())
    }

    pub async fn log_transfer(&self, record: &TransferRecord) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO transfer_log (wallet_address, recipient, lamports, outcome, signature, message, duration_ms, timestamp) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.wallet_address)
        .bind(&record.recipient)
        .bind(record.lamports as i64)
        .bind(&record.outcome)
        .bind(record.signature.as_deref())
        .bind(&record.message)
        .bind(record.duration_ms as i64)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await;

        Self::track(result.map(|_| ()))
    }

    pub async fn log_task_result(&self, wallet: &str, task: &str, outcome: &TaskResult) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO task_metrics (wallet_address, task_name, status, message, tx_hash, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(wallet)
        .bind(task)
        .bind(outcome.status())
        .bind(&outcome.message)
        .bind(outcome.tx_hash.as_deref())
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await;

        Self::track(result.map(|_| ()))
    }

    fn track(result: std::result::Result<(), sqlx::Error>) -> Result<()> {
        result.map_err(|e| {
            warn!("Database insert failed: {}", e);
            DatabaseError::QueryFailed { msg: e.to_string() }.into()
        })
    }

    pub async fn get_transfer_totals(&self, wallet: &str) -> Result<TransferTotals> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS attempts,
                    COALESCE(SUM(CASE WHEN outcome = 'SENT' THEN 1 ELSE 0 END), 0) AS sent,
                    COALESCE(SUM(CASE WHEN outcome = 'SENT' THEN lamports ELSE 0 END), 0) AS lamports_sent
             FROM transfer_log WHERE wallet_address = ?",
        )
        .bind(wallet)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed { msg: e.to_string() })?;

        Ok(TransferTotals {
            attempts: row.get::<i64, _>("attempts") as u64,
            sent: row.get::<i64, _>("sent") as u64,
            lamports_sent: row.get::<i64, _>("lamports_sent") as u64,
        })
    }

    pub async fn has_task_succeeded_since(
        &self,
        wallet: &str,
        task_name: &str,
        since_unix: i64,
    ) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM task_metrics WHERE wallet_address = ? AND task_name = ? AND status = 'SUCCESS' AND timestamp >= ?",
        )
        .bind(wallet)
        .bind(task_name)
        .bind(since_unix)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::QueryFailed { msg: e.to_string() })?;

        Ok(count > 0)
    }
}
