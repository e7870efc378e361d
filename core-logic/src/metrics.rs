use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// How a single transfer attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferOutcome {
    Sent,
    InsufficientFunds,
    Failed,
}

impl TransferOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferOutcome::Sent => "SENT",
            TransferOutcome::InsufficientFunds => "INSUFFICIENT",
            TransferOutcome::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: String,
    pub uptime_secs: u64,
    pub transfers: TransferMetrics,
    pub rpc: RpcMetrics,
    pub daily_tasks: DailyTaskMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferMetrics {
    pub attempted: u64,
    pub sent: u64,
    pub insufficient_funds: u64,
    pub failed: u64,
    pub lamports_sent: u64,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcMetrics {
    pub total_calls: u64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTaskMetrics {
    pub total: u64,
    pub success: u64,
}

#[derive(Debug)]
pub struct MetricsCollector {
    transfers_sent: AtomicU64,
    transfers_insufficient: AtomicU64,
    transfers_failed: AtomicU64,
    lamports_sent: AtomicU64,
    transfer_duration_sum_ms: AtomicU64,
    rpc_calls: AtomicU64,
    rpc_latency_sum_ms: AtomicU64,
    rpc_min_latency_ms: AtomicU64,
    rpc_max_latency_ms: AtomicU64,
    tasks_total: AtomicU64,
    tasks_success: AtomicU64,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            transfers_sent: AtomicU64::new(0),
            transfers_insufficient: AtomicU64::new(0),
            transfers_failed: AtomicU64::new(0),
            lamports_sent: AtomicU64::new(0),
            transfer_duration_sum_ms: AtomicU64::new(0),
            rpc_calls: AtomicU64::new(0),
            rpc_latency_sum_ms: AtomicU64::new(0),
            rpc_min_latency_ms: AtomicU64::new(u64::MAX),
            rpc_max_latency_ms: AtomicU64::new(0),
            tasks_total: AtomicU64::new(0),
            tasks_success: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }
}

impl MetricsCollector {
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<MetricsCollector> = OnceLock::new();
        INSTANCE.get_or_init(MetricsCollector::default)
    }

    pub fn record_transfer(&self, outcome: TransferOutcome, lamports: u64, duration: Duration) {
        self.transfer_duration_sum_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);

        match outcome {
            TransferOutcome::Sent => {
                self.transfers_sent.fetch_add(1, Ordering::SeqCst);
                self.lamports_sent.fetch_add(lamports, Ordering::SeqCst);
            }
            TransferOutcome::InsufficientFunds => {
                self.transfers_insufficient.fetch_add(1, Ordering::SeqCst);
            }
            TransferOutcome::Failed => {
                self.transfers_failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    pub fn record_rpc_latency(&self, latency: Duration) {
        let latency_ms = latency.as_millis() as u64;
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        self.rpc_latency_sum_ms.fetch_add(latency_ms, Ordering::SeqCst);
        self.rpc_min_latency_ms.fetch_min(latency_ms, Ordering::SeqCst);
        self.rpc_max_latency_ms.fetch_max(latency_ms, Ordering::SeqCst);
    }

    pub fn record_daily_task(&self, success: bool) {
        self.tasks_total.fetch_add(1, Ordering::SeqCst);
        if success {
            self.tasks_success.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn transfers_attempted(&self) -> u64 {
        self.transfers_sent.load(Ordering::SeqCst)
            + self.transfers_insufficient.load(Ordering::SeqCst)
            + self.transfers_failed.load(Ordering::SeqCst)
    }

    pub fn transfers_sent(&self) -> u64 {
        self.transfers_sent.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let attempted = self.transfers_attempted();
        let sent = self.transfers_sent();
        let duration_sum = self.transfer_duration_sum_ms.load(Ordering::SeqCst);

        let rpc_calls = self.rpc_calls.load(Ordering::SeqCst);
        let rpc_latency = self.rpc_latency_sum_ms.load(Ordering::SeqCst);
        let min_rpc = self.rpc_min_latency_ms.load(Ordering::SeqCst);

        let ratio = |num: u64, den: u64| if den > 0 { num as f64 / den as f64 } else { 0.0 };

        MetricsSnapshot {
            timestamp: Utc::now().to_rfc3339(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            transfers: TransferMetrics {
                attempted,
                sent,
                insufficient_funds: self.transfers_insufficient.load(Ordering::SeqCst),
                failed: self.transfers_failed.load(Ordering::SeqCst),
                lamports_sent: self.lamports_sent.load(Ordering::SeqCst),
                success_rate: ratio(sent, attempted) * 100.0,
                avg_duration_ms: ratio(duration_sum, attempted),
            },
            rpc: RpcMetrics {
                total_calls: rpc_calls,
                avg_latency_ms: ratio(rpc_latency, rpc_calls),
                min_latency_ms: if min_rpc == u64::MAX { 0 } else { min_rpc },
                max_latency_ms: self.rpc_max_latency_ms.load(Ordering::SeqCst),
            },
            daily_tasks: DailyTaskMetrics {
                total: self.tasks_total.load(Ordering::SeqCst),
                success: self.tasks_success.load(Ordering::SeqCst),
            },
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    pub async fn export_to_file(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_json()).await
    }
}
