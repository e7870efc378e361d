//! Daily check-in.
//!
//! The API hands out a check-in transaction; the wallet co-signs it, submits
//! it and reports the signature back.

use super::{TaskContext, TaskResult};
use crate::api::{ApiError, ALREADY_CHECKED_IN};
use anyhow::Result;
use async_trait::async_trait;
use core_logic::Task;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CheckInTask;

impl CheckInTask {
    async fn check_in(ctx: &TaskContext) -> Result<String> {
        let encoded = ctx.api.check_in_transaction().await?;
        let signature = ctx.sign_and_submit(&encoded).await?;
        ctx.api.confirm_check_in(&signature).await?;
        Ok(signature)
    }
}

fn already_checked_in(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .and_then(ApiError::message)
        .is_some_and(|m| m.contains(ALREADY_CHECKED_IN))
}

#[async_trait]
impl Task<Arc<TaskContext>> for CheckInTask {
    fn name(&self) -> &str {
        "01_check_in"
    }

    async fn run(&self, ctx: Arc<TaskContext>) -> Result<TaskResult> {
        match Self::check_in(&ctx).await {
            Ok(signature) => Ok(TaskResult::done("Checked in", Some(signature))),
            Err(e) if already_checked_in(&e) => Ok(TaskResult::skipped("Already checked in today")),
            Err(e) => Ok(TaskResult::failed(format!("Check-in failed: {:#}", e))),
        }
    }
}
