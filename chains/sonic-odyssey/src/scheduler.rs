//! Re-arms the batch orchestrator on a daily window or a fixed interval.

use crate::config::Policy;
use crate::orchestrator::{BatchOrchestrator, BatchSummary};
use crate::progress::ProgressTracker;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Timelike, Utc};
use core_logic::{MetricsCollector, WalletSecret};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{info, warn};

pub const FIXED_INTERVAL: Duration = Duration::from_secs(30 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Random hour of the window at the configured minute, today if that is
/// still ahead of `now` and `skip_today` is false, otherwise tomorrow.
pub fn next_daily_run<R: Rng + ?Sized>(
    now: DateTime<Utc>,
    policy: &Policy,
    rng: &mut R,
    skip_today: bool,
) -> DateTime<Utc> {
    let hour = policy.draw_execution_hour(rng);
    let time = NaiveTime::from_hms_opt(hour, policy.execution_minute, 0).unwrap_or(NaiveTime::MIN);
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(time));

    if skip_today || today <= now {
        today + ChronoDuration::days(1)
    } else {
        today
    }
}

pub fn in_execution_window(now: DateTime<Utc>, policy: &Policy) -> bool {
    (policy.execution_hour_min..=policy.execution_hour_max).contains(&now.hour())
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartupPlan {
    pub run_now: bool,
    pub next_run: DateTime<Utc>,
}

/// Starting inside the window runs a batch straight away and arms the next
/// day's window; otherwise the next window is armed normally.
pub fn plan_startup<R: Rng + ?Sized>(now: DateTime<Utc>, policy: &Policy, rng: &mut R) -> StartupPlan {
    let run_now = in_execution_window(now, policy);
    StartupPlan {
        run_now,
        next_run: next_daily_run(now, policy, rng, run_now),
    }
}

pub struct Scheduler {
    orchestrator: BatchOrchestrator,
    secrets: Vec<WalletSecret>,
    policy: Policy,
    progress: ProgressTracker,
    clock: Box<dyn Clock>,
    rng: StdRng,
    metrics_export: Option<String>,
}

impl Scheduler {
    pub fn new(
        orchestrator: BatchOrchestrator,
        secrets: Vec<WalletSecret>,
        policy: Policy,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            orchestrator,
            secrets,
            policy,
            progress,
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
            metrics_export: None,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_metrics_export(mut self, path: Option<String>) -> Self {
        self.metrics_export = path;
        self
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Runs forever unless `max_batches` is set. Returns early only when a
    /// batch fails.
    pub async fn run(&mut self, max_batches: Option<usize>) -> Result<()> {
        let mut completed = 0usize;
        let done = |completed: usize| max_batches.is_some_and(|max| completed >= max);

        if !self.policy.daily_timer_enabled {
            info!(
                "Daily timer disabled, running every {} minutes",
                FIXED_INTERVAL.as_secs() / 60
            );
            loop {
                self.batch().await?;
                completed += 1;
                if done(completed) {
                    return Ok(());
                }
                info!("Next batch in {} minutes", FIXED_INTERVAL.as_secs() / 60);
                tokio::time::sleep(FIXED_INTERVAL).await;
            }
        }

        let plan = plan_startup(self.clock.now(), &self.policy, &mut self.rng);
        if plan.run_now {
            info!("Started inside the execution window, running now");
            self.batch().await?;
            completed += 1;
        }
        let mut next_run = plan.next_run;

        while !done(completed) {
            let wait = (next_run - self.clock.now()).to_std().unwrap_or_default();
            info!(
                "Next batch at {} UTC (in {}h {}m)",
                next_run.format("%Y-%m-%d %H:%M"),
                wait.as_secs() / 3600,
                (wait.as_secs() % 3600) / 60
            );
            tokio::time::sleep(wait).await;

            self.batch().await?;
            completed += 1;
            next_run = next_daily_run(self.clock.now(), &self.policy, &mut self.rng, false);
        }
        Ok(())
    }

    async fn batch(&mut self) -> Result<BatchSummary> {
        let summary = self
            .orchestrator
            .run_batch(&self.secrets, &self.policy, &mut self.progress)
            .await?;

        if let Some(path) = &self.metrics_export {
            if let Err(e) = MetricsCollector::global().export_to_file(path).await {
                warn!("Could not export metrics to {}: {}", path, e);
            }
        }
        Ok(summary)
    }
}
