use anyhow::Result;
use async_trait::async_trait;

/// Outcome of one task run for one wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub success: bool,
    /// Nothing was done; counts as a success.
    pub skipped: bool,
    pub message: String,
    pub tx_hash: Option<String>,
}

impl TaskResult {
    pub fn done(message: impl Into<String>, tx_hash: Option<String>) -> Self {
        Self {
            success: true,
            skipped: false,
            message: message.into(),
            tx_hash,
        }
    }

    /// Nothing to do this time (already checked in, no boxes, ...).
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: true,
            message: message.into(),
            tx_hash: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            skipped: false,
            message: message.into(),
            tx_hash: None,
        }
    }

    /// Status as stored in `task_metrics`.
    pub fn status(&self) -> &'static str {
        match (self.success, self.skipped) {
            (true, false) => "SUCCESS",
            (true, true) => "SKIPPED",
            (false, _) => "FAILED",
        }
    }
}

#[async_trait]
pub trait Task<Ctx: Send + 'static>: Send + Sync {
    /// Returns the name of the task
    fn name(&self) -> &str;

    /// Executes the task
    async fn run(&self, ctx: Ctx) -> Result<TaskResult>;
}
