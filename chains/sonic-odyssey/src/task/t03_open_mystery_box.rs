//! Opens every mystery box the wallet has earned.

use super::{TaskContext, TaskResult};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::Task;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct OpenMysteryBoxTask;

impl OpenMysteryBoxTask {
    async fn open_one(ctx: &TaskContext) -> Result<(String, String)> {
        let encoded = ctx.api.build_mystery_box_transaction().await?;
        let signature = ctx.sign_and_submit(&encoded).await?;
        let amount = ctx.api.open_mystery_box(&signature).await?;
        Ok((signature, amount))
    }
}

#[async_trait]
impl Task<Arc<TaskContext>> for OpenMysteryBoxTask {
    fn name(&self) -> &str {
        "03_open_mystery_box"
    }

    async fn run(&self, ctx: Arc<TaskContext>) -> Result<TaskResult> {
        let boxes = match ctx.api.mystery_box_count().await {
            Ok(boxes) => boxes,
            Err(e) => return Ok(TaskResult::failed(format!("Rewards info unavailable: {}", e))),
        };
        if boxes == 0 {
            return Ok(TaskResult::skipped("No mystery boxes to open"));
        }
        info!("[{}] {} mystery boxes to open", ctx.address(), boxes);

        let mut opened = 0u64;
        let mut last_signature = None;
        for n in 1..=boxes {
            match Self::open_one(&ctx).await {
                Ok((signature, amount)) => {
                    info!("[{}] Box {}/{} opened, reward {}", ctx.address(), n, boxes, amount);
                    opened += 1;
                    last_signature = Some(signature);
                }
                Err(e) => warn!("[{}] Box {}/{} Failed: {:#}", ctx.address(), n, boxes, e),
            }
            if n < boxes {
                tokio::time::sleep(ctx.pause).await;
            }
        }

        let message = format!("Opened {}/{} mystery boxes", opened, boxes);
        Ok(if opened == boxes {
            TaskResult::done(message, last_signature)
        } else {
            TaskResult::failed(message)
        })
    }
}
