//! Daily reward operations for every wallet: log in to the rewards API,
//! then run the task list.

use crate::api::SonicApiClient;
use crate::chain::ChainClient;
use crate::orchestrator::DailyOperations;
use crate::task::{daily_tasks, TaskContext};
use crate::wallet::WalletIdentity;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use core_logic::{
    DatabaseManager, MetricsCollector, ProxyConfig, ProxyManager, TaskResult, WalletSecret,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const WALLET_PAUSE: Duration = Duration::from_secs(3);
pub const STEP_PAUSE: Duration = Duration::from_secs(2);

/// Unix timestamp of 00:00 UTC on the day of `now`.
pub fn utc_day_start(now: DateTime<Utc>) -> i64 {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN))
        .timestamp()
}

pub struct SonicDailyOperations {
    secrets: Arc<Vec<WalletSecret>>,
    chain: Arc<dyn ChainClient>,
    api_base_url: String,
    proxies: Vec<ProxyConfig>,
    db: Option<Arc<DatabaseManager>>,
    request_timeout: Duration,
}

impl SonicDailyOperations {
    pub fn new(
        secrets: Arc<Vec<WalletSecret>>,
        chain: Arc<dyn ChainClient>,
        api_base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            secrets,
            chain,
            api_base_url: api_base_url.into(),
            proxies: Vec::new(),
            db: None,
            request_timeout,
        }
    }

    pub fn with_proxies(mut self, proxies: Vec<ProxyConfig>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_database(mut self, db: Option<Arc<DatabaseManager>>) -> Self {
        self.db = db;
        self
    }

    /// True when the transfer log shows `task` succeeded for `address` today.
    async fn done_today(&self, address: &str, task: &str) -> bool {
        let Some(db) = &self.db else {
            return false;
        };
        match db
            .has_task_succeeded_since(address, task, utc_day_start(Utc::now()))
            .await
        {
            Ok(done) => done,
            Err(e) => {
                warn!("Could not read task history: {:#}", e);
                false
            }
        }
    }

    /// Returns false when the wallet could not be logged in.
    async fn process_wallet(&self, index: usize, secret: &WalletSecret) -> Result<bool> {
        let wallet = match WalletIdentity::derive(index, secret) {
            Ok(wallet) => wallet,
            Err(e) => {
                error!("Wallet {} Skipped: {}", index + 1, e);
                return Ok(false);
            }
        };
        let address = wallet.address().to_string();
        info!("Daily operations for wallet {} ({})", index + 1, address);

        let proxy = ProxyManager::for_wallet(&self.proxies, index);
        let mut api = SonicApiClient::new(&self.api_base_url, proxy, self.request_timeout)?;
        if let Err(e) = api.authenticate(&wallet).await {
            warn!("[{}] Login Failed: {}", address, e);
            return Ok(false);
        }

        let ctx = Arc::new(TaskContext {
            api,
            chain: Arc::clone(&self.chain),
            wallet,
            pause: STEP_PAUSE,
        });

        let tasks = daily_tasks();
        let last = tasks.len().saturating_sub(1);
        for (step, task) in tasks.iter().enumerate() {
            if self.done_today(&address, task.name()).await {
                info!("[{}] {} Skipped: already done today", address, task.name());
                continue;
            }

            let result = match task.run(Arc::clone(&ctx)).await {
                Ok(result) => result,
                Err(e) => TaskResult::failed(format!("{:#}", e)),
            };

            if result.success {
                info!("[{}] {}: {}", address, task.name(), result.message);
            } else {
                warn!("[{}] {} Failed: {}", address, task.name(), result.message);
            }
            MetricsCollector::global().record_daily_task(result.success);

            if let Some(db) = &self.db {
                if let Err(e) = db.log_task_result(&address, task.name(), &result).await {
                    warn!("Failed to log task result: {:#}", e);
                }
            }

            if step < last {
                tokio::time::sleep(STEP_PAUSE).await;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl DailyOperations for SonicDailyOperations {
    async fn run_daily_operations(&self) -> Result<()> {
        let total = self.secrets.len();
        let mut logged_in = 0usize;

        for (index, secret) in self.secrets.iter().enumerate() {
            if self.process_wallet(index, secret).await? {
                logged_in += 1;
            }
            if index + 1 < total {
                tokio::time::sleep(WALLET_PAUSE).await;
            }
        }

        info!(
            "Daily operations finished for {}/{} wallets",
            logged_in, total
        );
        if total > 0 && logged_in == 0 {
            bail!("no wallet could log in to the rewards API");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_start_is_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 17, 45, 12).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();
        assert_eq!(utc_day_start(now), start.timestamp());
        assert_eq!(utc_day_start(start), start.timestamp());
    }
}
