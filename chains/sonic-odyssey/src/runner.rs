//! Per-wallet transfer loop.
//!
//! The runner resumes at the persisted transaction index, sends up to a
//! randomly drawn number of transfers to fresh addresses, and writes the
//! progress record after every attempt. A wallet is given up on when its
//! starting balance is too low or after ten insufficient-balance outcomes.

use crate::chain::{ChainClient, SubmitError};
use crate::config::{lamports_to_sol, sol_to_lamports_ceil, Policy};
use crate::progress::ProgressTracker;
use crate::wallet::WalletIdentity;
use anyhow::Result;
use core_logic::{
    with_retry_if, DatabaseManager, MetricsCollector, RetryConfig, TransferOutcome,
    TransferRecord, TX_RESULT_TARGET,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub const BALANCE_FLOOR_SOL: f64 = 0.005;
pub const INSUFFICIENT_BALANCE_LIMIT: u32 = 10;
pub const SEND_ATTEMPTS: u32 = 3;
pub const SEND_RETRY_DELAY_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq)]
pub enum TransactionOutcome {
    Sent { signature: Signature, lamports: u64 },
    InsufficientBalance,
    TransientFailure(String),
}

impl TransactionOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, TransactionOutcome::Sent { .. })
    }

    fn metric(&self) -> TransferOutcome {
        match self {
            TransactionOutcome::Sent { .. } => TransferOutcome::Sent,
            TransactionOutcome::InsufficientBalance => TransferOutcome::InsufficientFunds,
            TransactionOutcome::TransientFailure(_) => TransferOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbandonReason {
    LowStartingBalance,
    CircuitBreaker,
    InvalidSecret,
    BalanceUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletRunSummary {
    pub wallet_index: usize,
    pub address: String,
    pub target: u32,
    pub attempted: u32,
    pub sent: u32,
    pub failed: u32,
    pub insufficient_strikes: u32,
    pub lamports_sent: u64,
    pub start_balance: Option<u64>,
    pub end_balance: Option<u64>,
    /// Resume cursor reached before the wallet was closed.
    pub last_transaction_index: u32,
    pub abandoned: Option<AbandonReason>,
}

impl WalletRunSummary {
    pub fn new(wallet_index: usize, address: impl Into<String>, resume_index: u32) -> Self {
        Self {
            wallet_index,
            address: address.into(),
            target: 0,
            attempted: 0,
            sent: 0,
            failed: 0,
            insufficient_strikes: 0,
            lamports_sent: 0,
            start_balance: None,
            end_balance: None,
            last_transaction_index: resume_index,
            abandoned: None,
        }
    }

    pub fn abandoned(
        wallet_index: usize,
        address: impl Into<String>,
        resume_index: u32,
        reason: AbandonReason,
    ) -> Self {
        Self {
            abandoned: Some(reason),
            ..Self::new(wallet_index, address, resume_index)
        }
    }
}

pub struct WalletTransactionRunner {
    chain: Arc<dyn ChainClient>,
    db: Option<Arc<DatabaseManager>>,
    retry: RetryConfig,
    breaker_limit: u32,
    balance_floor: u64,
    rng: StdRng,
}

impl WalletTransactionRunner {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self {
            chain,
            db: None,
            retry: RetryConfig::fixed(SEND_ATTEMPTS, SEND_RETRY_DELAY_MS),
            breaker_limit: INSUFFICIENT_BALANCE_LIMIT,
            balance_floor: sol_to_lamports_ceil(BALANCE_FLOOR_SOL),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_database(mut self, db: Option<Arc<DatabaseManager>>) -> Self {
        self.db = db;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Runs one wallet to completion or abandonment and leaves the progress
    /// cursor on the next wallet. Only persistence failures are errors.
    pub async fn run(
        &mut self,
        wallet: &WalletIdentity,
        policy: &Policy,
        progress: &mut ProgressTracker,
    ) -> Result<WalletRunSummary> {
        let address = wallet.address();
        let resume_index = progress.transaction_index();
        let mut summary = WalletRunSummary::new(wallet.index(), address.to_string(), resume_index);

        let start_balance = match self.chain.get_balance(&address).await {
            Ok(balance) => balance,
            Err(e) => {
                warn!("[{}] Skipped: balance unavailable ({:#})", address, e);
                summary.abandoned = Some(AbandonReason::BalanceUnavailable);
                progress.advance_wallet()?;
                return Ok(summary);
            }
        };
        summary.start_balance = Some(start_balance);
        info!("[{}] Balance: {:.6} SOL", address, lamports_to_sol(start_balance));

        if start_balance < policy.min_wallet_balance_lamports() {
            warn!(
                "[{}] Skipped: balance below {} SOL minimum",
                address, policy.min_wallet_balance
            );
            summary.abandoned = Some(AbandonReason::LowStartingBalance);
            progress.advance_wallet()?;
            return Ok(summary);
        }

        let target = policy.draw_tx_count(&mut self.rng);
        summary.target = target;
        if target <= resume_index {
            info!(
                "[{}] Target {} already reached (resuming at {}), nothing to send",
                address, target, resume_index
            );
        } else {
            info!(
                "[{}] Sending transactions {}..{} of {}",
                address,
                resume_index + 1,
                target,
                target
            );
        }

        let recipients: Vec<Pubkey> = (resume_index..target)
            .map(|_| self.chain.generate_address())
            .collect();

        let mut estimated_balance = start_balance;
        for (index, recipient) in (resume_index..target).zip(recipients) {
            let lamports = policy.draw_amount_lamports(&mut self.rng);
            let started = Instant::now();

            let outcome = if estimated_balance < self.balance_floor {
                TransactionOutcome::InsufficientBalance
            } else {
                self.send(wallet, &recipient, lamports).await
            };

            self.report(wallet, &recipient, index, target, lamports, &outcome, started)
                .await;

            summary.attempted += 1;
            match &outcome {
                TransactionOutcome::Sent { lamports, .. } => {
                    summary.sent += 1;
                    summary.lamports_sent += lamports;
                    estimated_balance = estimated_balance.saturating_sub(*lamports);
                }
                TransactionOutcome::InsufficientBalance => summary.insufficient_strikes += 1,
                TransactionOutcome::TransientFailure(_) => summary.failed += 1,
            }

            progress.record_attempt(index + 1, outcome.is_sent())?;
            summary.last_transaction_index = index + 1;

            if summary.insufficient_strikes >= self.breaker_limit {
                warn!(
                    "[{}] {} insufficient-balance outcomes, moving to the next wallet",
                    address, summary.insufficient_strikes
                );
                summary.abandoned = Some(AbandonReason::CircuitBreaker);
                break;
            }

            if index + 1 < target {
                tokio::time::sleep(policy.draw_delay(&mut self.rng)).await;
            }
        }

        match self.chain.get_balance(&address).await {
            Ok(balance) => summary.end_balance = Some(balance),
            Err(e) => warn!("[{}] Could not read final balance: {:#}", address, e),
        }

        info!(
            "[{}] Done: {} sent, {} failed, {} insufficient",
            address, summary.sent, summary.failed, summary.insufficient_strikes
        );
        progress.advance_wallet()?;
        Ok(summary)
    }

    async fn send(
        &self,
        wallet: &WalletIdentity,
        recipient: &Pubkey,
        lamports: u64,
    ) -> TransactionOutcome {
        let chain = Arc::clone(&self.chain);
        let result = with_retry_if(
            self.retry,
            "transfer",
            || chain.transfer(wallet, recipient, lamports),
            |e: &SubmitError| !e.is_insufficient_funds(),
        )
        .await;

        match result {
            Ok(signature) => TransactionOutcome::Sent {
                signature,
                lamports,
            },
            Err(e) => {
                let attempts = e.attempts();
                match e.into_inner() {
                    SubmitError::InsufficientFunds(_) => TransactionOutcome::InsufficientBalance,
                    other => TransactionOutcome::TransientFailure(format!(
                        "{} (after {} attempts)",
                        other, attempts
                    )),
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn report(
        &self,
        wallet: &WalletIdentity,
        recipient: &Pubkey,
        index: u32,
        target: u32,
        lamports: u64,
        outcome: &TransactionOutcome,
        started: Instant,
    ) {
        let address = wallet.address();
        let duration = started.elapsed();
        let amount = lamports_to_sol(lamports);

        let (signature, message) = match outcome {
            TransactionOutcome::Sent { signature, .. } => {
                info!(
                    target: TX_RESULT_TARGET,
                    "[{}] Tx {}/{} Sent {:.6} SOL to {} | {}",
                    address, index + 1, target, amount, recipient, signature
                );
                (Some(signature.to_string()), String::new())
            }
            TransactionOutcome::InsufficientBalance => {
                warn!(
                    target: TX_RESULT_TARGET,
                    "[{}] Tx {}/{} Failed: insufficient balance for {:.6} SOL",
                    address, index + 1, target, amount
                );
                (None, "insufficient balance".to_string())
            }
            TransactionOutcome::TransientFailure(reason) => {
                warn!(
                    target: TX_RESULT_TARGET,
                    "[{}] Tx {}/{} Failed: {}",
                    address, index + 1, target, reason
                );
                (None, reason.clone())
            }
        };

        MetricsCollector::global().record_transfer(outcome.metric(), lamports, duration);

        if let Some(db) = &self.db {
            let record = TransferRecord {
                wallet_address: address.to_string(),
                recipient: recipient.to_string(),
                lamports,
                outcome: outcome.metric().as_str().to_string(),
                signature,
                message,
                duration_ms: duration.as_millis() as u64,
            };
            if let Err(e) = db.log_transfer(&record).await {
                warn!("Failed to log transfer: {:#}", e);
            }
        }
    }
}
