//! Settings and batch policy.
//!
//! Endpoints and file locations come from a TOML file through the `config`
//! crate (with `SONIC_*` environment overrides). The batch policy lives in
//! `config.json` and is edited from the interactive menu.

use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use core_logic::{ConfigError, JsonFile, ProxyManager, StoreError, WalletManager};
use rand::Rng;
use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_RPC_URL: &str = "https://api.testnet.sonic.game/";
pub const DEFAULT_API_BASE_URL: &str = "https://api.testnet.v1.sonic.game";

#[derive(Debug, Clone, Deserialize)]
pub struct SonicSettings {
    pub rpc_url: String,
    pub api_base_url: String,
    pub keys_file: PathBuf,
    pub wallets_dir: PathBuf,
    pub proxies_file: PathBuf,
    pub config_file: PathBuf,
    pub progress_file: PathBuf,
    pub db_path: String,
    pub request_timeout_secs: u64,
}

impl SonicSettings {
    /// Defaults, then `path` if it exists, then `SONIC_*` variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .set_default("rpc_url", DEFAULT_RPC_URL)?
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("keys_file", WalletManager::KEYS_FILE)?
            .set_default("wallets_dir", WalletManager::WALLETS_DIR)?
            .set_default("proxies_file", ProxyManager::PROXY_FILE)?
            .set_default("config_file", "config.json")?
            .set_default("progress_file", "progress.json")?
            .set_default("db_path", "sonic-odyssey.db")?
            .set_default("request_timeout_secs", 30)?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SONIC"))
            .build()
            .with_context(|| format!("Failed to read settings from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to parse settings")
    }
}

/// Tunable batch parameters. Amounts are in SOL, delays in milliseconds,
/// hours and minutes in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    #[serde(rename = "MIN_TRANSACTIONS")]
    pub min_tx_count: u32,
    #[serde(rename = "MAX_TRANSACTIONS")]
    pub max_tx_count: u32,
    #[serde(rename = "MIN_DELAY")]
    pub min_delay_ms: u64,
    #[serde(rename = "MAX_DELAY")]
    pub max_delay_ms: u64,
    #[serde(rename = "MIN_AMOUNT")]
    pub min_amount: f64,
    #[serde(rename = "MAX_AMOUNT")]
    pub max_amount: f64,
    #[serde(rename = "EXECUTION_HOUR_MIN")]
    pub execution_hour_min: u32,
    #[serde(rename = "EXECUTION_HOUR_MAX")]
    pub execution_hour_max: u32,
    #[serde(rename = "EXECUTION_MINUTE")]
    pub execution_minute: u32,
    #[serde(rename = "MIN_WALLET_BALANCE")]
    pub min_wallet_balance: f64,
    #[serde(rename = "USE_DAILY_TIMER")]
    pub daily_timer_enabled: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_tx_count: 108,
            max_tx_count: 120,
            min_delay_ms: 4000,
            max_delay_ms: 15000,
            min_amount: 0.001,
            max_amount: 0.003,
            execution_hour_min: 1,
            execution_hour_max: 5,
            execution_minute: 0,
            min_wallet_balance: 0.01,
            daily_timer_enabled: true,
        }
    }
}

// Snaps values like 2999999.9999999996 back onto the whole lamport.
fn scaled_lamports(sol: f64) -> f64 {
    let scaled = sol * LAMPORTS_PER_SOL as f64;
    let nearest = scaled.round();
    if (scaled - nearest).abs() < 1e-6 {
        nearest
    } else {
        scaled
    }
}

pub fn sol_to_lamports_floor(sol: f64) -> u64 {
    scaled_lamports(sol).floor() as u64
}

pub fn sol_to_lamports_ceil(sol: f64) -> u64 {
    scaled_lamports(sol).ceil() as u64
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

fn check_range<T: PartialOrd + ToString>(field: &str, min: T, max: T) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvalidRange {
            field: field.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.into(),
    }
}

impl Policy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("transactions", self.min_tx_count, self.max_tx_count)?;
        check_range("delay", self.min_delay_ms, self.max_delay_ms)?;
        check_range("amount", self.min_amount, self.max_amount)?;
        check_range("execution hour", self.execution_hour_min, self.execution_hour_max)?;

        if !(self.min_amount > 0.0 && self.min_amount.is_finite() && self.max_amount.is_finite()) {
            return Err(invalid("amount", "must be a positive number of SOL"));
        }
        if sol_to_lamports_ceil(self.min_amount) > sol_to_lamports_floor(self.max_amount) {
            return Err(invalid("amount", "range contains no whole lamport amount"));
        }
        if !(self.min_wallet_balance >= 0.0 && self.min_wallet_balance.is_finite()) {
            return Err(invalid("min wallet balance", "must be zero or more SOL"));
        }
        if self.execution_hour_max > 23 {
            return Err(invalid("execution hour", "must be between 0 and 23"));
        }
        if self.execution_minute > 59 {
            return Err(invalid("execution minute", "must be between 0 and 59"));
        }
        Ok(())
    }

    pub fn draw_tx_count<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.min_tx_count..=self.max_tx_count)
    }

    /// Whole lamports in `[ceil(min), floor(max)]`.
    pub fn draw_amount_lamports<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let min = sol_to_lamports_ceil(self.min_amount);
        let max = sol_to_lamports_floor(self.max_amount).max(min);
        rng.gen_range(min..=max)
    }

    pub fn draw_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.gen_range(self.min_delay_ms..=self.max_delay_ms))
    }

    pub fn draw_execution_hour<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.gen_range(self.execution_hour_min..=self.execution_hour_max)
    }

    pub fn min_wallet_balance_lamports(&self) -> u64 {
        sol_to_lamports_ceil(self.min_wallet_balance)
    }
}

/// Durable home of the [`Policy`].
pub trait PolicyStore: Send + Sync {
    /// Never fails: a missing, corrupt or invalid record yields the defaults,
    /// which are written back.
    fn load(&self) -> Policy;

    fn save(&self, policy: &Policy) -> Result<(), StoreError>;

    /// Applies `edit` to a copy of `current`, validates it, persists it and
    /// only then replaces `current`. A rejected edit leaves both untouched.
    fn update<F>(&self, current: &mut Policy, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Policy),
        Self: Sized,
    {
        let mut candidate = current.clone();
        edit(&mut candidate);
        candidate.validate()?;
        self.save(&candidate)?;
        *current = candidate;
        Ok(())
    }
}

pub struct JsonPolicyStore {
    file: JsonFile,
}

impl JsonPolicyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }

    fn reset(&self, reason: &str) -> Policy {
        warn!(
            "{} {}, falling back to defaults",
            self.file.path().display(),
            reason
        );
        let policy = Policy::default();
        if let Err(e) = self.file.write(&policy) {
            warn!("Could not write default policy: {}", e);
        }
        policy
    }
}

impl PolicyStore for JsonPolicyStore {
    fn load(&self) -> Policy {
        match self.file.read::<Policy>() {
            Ok(Some(policy)) => match policy.validate() {
                Ok(()) => {
                    info!("Loaded policy from {}", self.file.path().display());
                    policy
                }
                Err(e) => self.reset(&format!("is invalid ({})", e)),
            },
            Ok(None) => {
                info!(
                    "{} not found, creating it with defaults",
                    self.file.path().display()
                );
                let policy = Policy::default();
                if let Err(e) = self.file.write(&policy) {
                    warn!("Could not write default policy: {}", e);
                }
                policy
            }
            Err(e) => self.reset(&format!("could not be read ({})", e)),
        }
    }

    fn save(&self, policy: &Policy) -> Result<(), StoreError> {
        self.file.write(policy)
    }
}
