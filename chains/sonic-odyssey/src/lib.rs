//! Sonic Odyssey - wallet-batch transfer bot for the Sonic testnet
//!
//! Sends a random number of small native transfers from every wallet on a
//! daily window (or a fixed interval), resuming from `progress.json` after a
//! restart, then collects the daily Odyssey rewards for each wallet.
//!
//! # Architecture
//!
//! - [`scheduler::Scheduler`] decides when a batch runs
//! - [`orchestrator::BatchOrchestrator`] walks the wallet list and triggers
//!   the [`orchestrator::DailyOperations`] once per batch
//! - [`runner::WalletTransactionRunner`] sends one wallet's transfers
//! - [`progress::ProgressTracker`] persists the resume cursor
//! - [`chain::ChainClient`] and [`api::SonicApiClient`] talk to the network

pub mod api;
pub mod chain;
pub mod config;
pub mod daily;
pub mod menu;
pub mod orchestrator;
pub mod progress;
pub mod runner;
pub mod scheduler;
pub mod task;
pub mod wallet;

pub use chain::{ChainClient, SonicRpcClient, SubmitError};
pub use config::{JsonPolicyStore, Policy, PolicyStore, SonicSettings};
pub use orchestrator::{BatchOrchestrator, BatchSummary, DailyOperations};
pub use progress::{fingerprint, JsonProgressStore, Progress, ProgressStore, ProgressTracker};
pub use runner::{AbandonReason, TransactionOutcome, WalletRunSummary, WalletTransactionRunner};
pub use scheduler::Scheduler;
pub use wallet::WalletIdentity;
