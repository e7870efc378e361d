//! Daily reward tasks run for each wallet after a batch.
//!
//! Each task implements [`core_logic::Task`] over a shared [`TaskContext`]
//! and reports a [`TaskResult`]. "Already done today" answers from the API
//! are reported as skipped, not failed.

pub mod t01_check_in;
pub mod t02_claim_rewards;
pub mod t03_open_mystery_box;

use crate::api::SonicApiClient;
use crate::chain::{decode_transaction, sign_partial, ChainClient, SubmitError};
use crate::wallet::WalletIdentity;
use anyhow::{Context, Result};
use core_logic::{with_retry, RetryConfig};
use std::sync::Arc;
use std::time::Duration;

pub use core_logic::{Task, TaskResult};
pub use t01_check_in::CheckInTask;
pub use t02_claim_rewards::ClaimRewardsTask;
pub use t03_open_mystery_box::OpenMysteryBoxTask;

/// One submission plus three retries, a second apart.
pub const SUBMIT_RETRY: RetryConfig = RetryConfig {
    max_attempts: 4,
    base_delay_ms: 1000,
    max_delay_ms: 1000,
    exponential_base: 1.0,
    jitter: false,
};

pub struct TaskContext {
    pub api: SonicApiClient,
    pub chain: Arc<dyn ChainClient>,
    pub wallet: WalletIdentity,
    /// Pause between repeated actions inside a task.
    pub pause: Duration,
}

impl TaskContext {
    pub fn address(&self) -> String {
        self.wallet.address().to_string()
    }

    /// Signs a base64 transaction built by the API and submits it.
    pub async fn sign_and_submit(&self, encoded: &str) -> Result<String> {
        let mut tx = decode_transaction(encoded)?;
        sign_partial(&mut tx, &self.wallet)?;

        let chain = Arc::clone(&self.chain);
        let signature = with_retry(SUBMIT_RETRY, "submit transaction", || {
            chain.submit_transaction(&tx)
        })
        .await
        .map_err(|e| e.into_inner())
        .map_err(|e: SubmitError| anyhow::anyhow!(e))
        .context("Transaction was not confirmed")?;

        Ok(signature.to_string())
    }
}

/// Task list in execution order.
pub fn daily_tasks() -> Vec<Box<dyn Task<Arc<TaskContext>>>> {
    vec![
        Box::new(CheckInTask),
        Box::new(ClaimRewardsTask),
        Box::new(OpenMysteryBoxTask),
    ]
}
