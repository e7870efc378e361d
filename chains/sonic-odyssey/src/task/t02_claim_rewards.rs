//! Transaction milestone rewards, stages 1 to 3.

use super::{TaskContext, TaskResult};
use crate::api::{ApiError, STAGE_ALREADY_CLAIMED};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::Task;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Stages unlock once the wallet has more than this many transactions today.
pub const MIN_DAILY_TRANSACTIONS: u64 = 10;
pub const STAGES: [u8; 3] = [1, 2, 3];
const CLAIM_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct ClaimRewardsTask;

#[derive(Debug, Default, PartialEq)]
struct ClaimTally {
    claimed: u32,
    already: u32,
    failed: u32,
}

fn is_already_claimed(err: &ApiError) -> bool {
    err.code().is_some_and(|code| STAGE_ALREADY_CLAIMED.contains(&code))
}

#[async_trait]
impl Task<Arc<TaskContext>> for ClaimRewardsTask {
    fn name(&self) -> &str {
        "02_claim_rewards"
    }

    async fn run(&self, ctx: Arc<TaskContext>) -> Result<TaskResult> {
        let count = match ctx.api.daily_transaction_count().await {
            Ok(count) => count,
            Err(e) => return Ok(TaskResult::failed(format!("Daily state unavailable: {}", e))),
        };
        info!("[{}] {} transactions today", ctx.address(), count);

        if count <= MIN_DAILY_TRANSACTIONS {
            return Ok(TaskResult::skipped(format!(
                "Only {} transactions today, need more than {}",
                count, MIN_DAILY_TRANSACTIONS
            )));
        }

        let mut tally = ClaimTally::default();
        for stage in STAGES {
            match ctx.api.claim_stage(stage).await {
                Ok(_) => {
                    info!("[{}] Stage {} claimed", ctx.address(), stage);
                    tally.claimed += 1;
                    tokio::time::sleep(CLAIM_PAUSE).await;
                }
                Err(e) if is_already_claimed(&e) => tally.already += 1,
                Err(e) => {
                    warn!("[{}] Stage {} Failed: {}", ctx.address(), stage, e);
                    tally.failed += 1;
                }
            }
        }

        let message = format!(
            "Stages claimed: {}, already claimed: {}, failed: {}",
            tally.claimed, tally.already, tally.failed
        );
        Ok(if tally.failed == 0 {
            TaskResult::done(message, None)
        } else {
            TaskResult::failed(message)
        })
    }
}
