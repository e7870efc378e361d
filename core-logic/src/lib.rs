//! # Core Logic - Shared Utilities for the Sonic Odyssey Bot
//!
//! Chain-agnostic plumbing used by the bot binary: typed errors, wallet
//! secret loading, durable JSON records, the SQLite transfer log, retry
//! helpers, metrics and the console/file logger.
//!
//! ## Modules
//!
//! - [`config`] - Wallet source and proxy settings
//! - [`database`] - SQLite history of transfers and daily tasks
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Transfer and RPC counters
//! - [`security`] - Encrypted wallet file support
//! - [`traits`] - Per-wallet task trait
//! - [`utils`] - Wallet, proxy, retry, JSON record and logging helpers

pub mod config;
pub mod database;
pub mod error;
pub mod metrics;
pub mod security;
pub mod traits;
pub(crate) mod utils;

pub use config::{ProxyConfig, WalletSource};
pub use database::{DatabaseManager, TransferRecord, TransferTotals};
pub use error::{ConfigError, DatabaseError, SecurityError, StoreError, WalletError};
pub use metrics::{MetricsCollector, MetricsSnapshot, TransferOutcome};
pub use security::{EncryptedComponents, SecurityUtils};
pub use traits::{Task, TaskResult};

pub use utils::{setup_logger, JsonFile, ProxyManager, WalletManager, WalletSecret, TX_RESULT_TARGET};

pub use utils::retry::{with_retry, with_retry_if, RetryConfig, RetryError};
