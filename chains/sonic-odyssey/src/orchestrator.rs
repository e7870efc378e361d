//! One pass over every wallet, followed by the daily reward operations.

use crate::config::Policy;
use crate::progress::ProgressTracker;
use crate::runner::{AbandonReason, WalletRunSummary, WalletTransactionRunner};
use crate::wallet::WalletIdentity;
use anyhow::Result;
use async_trait::async_trait;
use core_logic::WalletSecret;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const WALLET_DELAY: Duration = Duration::from_secs(60);

/// End-of-batch collaborator (check-in, reward claims, mystery boxes).
#[async_trait]
pub trait DailyOperations: Send + Sync {
    async fn run_daily_operations(&self) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub wallets: Vec<WalletRunSummary>,
    pub total_attempted: u64,
    pub total_sent: u64,
    pub total_failed: u64,
    pub total_lamports_sent: u64,
    pub daily_operations_ok: bool,
}

impl BatchSummary {
    fn push(&mut self, wallet: WalletRunSummary) {
        self.total_attempted += u64::from(wallet.attempted);
        self.total_sent += u64::from(wallet.sent);
        self.total_failed += u64::from(wallet.failed + wallet.insufficient_strikes);
        self.total_lamports_sent += wallet.lamports_sent;
        self.wallets.push(wallet);
    }
}

pub struct BatchOrchestrator {
    runner: WalletTransactionRunner,
    daily: Arc<dyn DailyOperations>,
    wallet_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(runner: WalletTransactionRunner, daily: Arc<dyn DailyOperations>) -> Self {
        Self {
            runner,
            daily,
            wallet_delay: WALLET_DELAY,
        }
    }

    /// Works through the wallets from the persisted cursor onwards, then
    /// rewinds the cursor and runs the daily operations once.
    pub async fn run_batch(
        &mut self,
        secrets: &[WalletSecret],
        policy: &Policy,
        progress: &mut ProgressTracker,
    ) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let total = secrets.len();
        let start = progress.wallet_index();

        if start > 0 && start < total {
            info!("Resuming batch at wallet {}/{}", start + 1, total);
        }

        for (index, secret) in secrets.iter().enumerate().skip(start) {
            info!("Processing wallet {}/{}", index + 1, total);

            let wallet_summary = match WalletIdentity::derive(index, secret) {
                Ok(wallet) => self.runner.run(&wallet, policy, progress).await?,
                Err(e) => {
                    error!("Wallet {}/{} Skipped: {}", index + 1, total, e);
                    let reached = progress.transaction_index();
                    progress.advance_wallet()?;
                    WalletRunSummary::abandoned(
                        index,
                        String::new(),
                        reached,
                        AbandonReason::InvalidSecret,
                    )
                }
            };
            summary.push(wallet_summary);

            if index + 1 < total {
                info!(
                    "Waiting {}s before the next wallet",
                    self.wallet_delay.as_secs()
                );
                tokio::time::sleep(self.wallet_delay).await;
            }
        }

        progress.reset_cursor()?;
        let totals = progress.current();
        info!(
            "Batch finished: {} sent, {} failed across {} wallets ({} sent, {} failed overall)",
            summary.total_sent,
            summary.total_failed,
            summary.wallets.len(),
            totals.success_count,
            totals.fail_count
        );

        info!("Running daily operations");
        summary.daily_operations_ok = match self.daily.run_daily_operations().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Daily operations Failed: {:#}", e);
                false
            }
        };

        Ok(summary)
    }
}
