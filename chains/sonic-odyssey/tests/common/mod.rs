#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use core_logic::{StoreError, WalletSecret};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;
use sonic_odyssey::{
    ChainClient, DailyOperations, Policy, Progress, ProgressStore, SubmitError, WalletIdentity,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SOL: u64 = 1_000_000_000;

/// Chain double: per-wallet balances and a queue of scripted transfer
/// results (falling back to `default_result` once the queue is empty).
pub struct MockChain {
    balances: Mutex<HashMap<Pubkey, u64>>,
    pub default_balance: Option<u64>,
    scripted: Mutex<VecDeque<Result<(), SubmitError>>>,
    default_result: Result<(), SubmitError>,
    pub transfer_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub transfers: Mutex<Vec<(Pubkey, Pubkey, u64)>>,
}

impl MockChain {
    pub fn new(default_balance: Option<u64>, default_result: Result<(), SubmitError>) -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            default_balance,
            scripted: Mutex::new(VecDeque::new()),
            default_result,
            transfer_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn funded(balance: u64) -> Self {
        Self::new(Some(balance), Ok(()))
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.balances.lock().unwrap().insert(address, lamports);
    }

    pub fn script(&self, results: Vec<Result<(), SubmitError>>) {
        self.scripted.lock().unwrap().extend(results);
    }

    pub fn transfer_calls(&self) -> usize {
        self.transfer_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(balance) = self.balances.lock().unwrap().get(address) {
            return Ok(*balance);
        }
        self.default_balance
            .ok_or_else(|| anyhow!("connection refused"))
    }

    async fn transfer(
        &self,
        from: &WalletIdentity,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, SubmitError> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default_result.clone());
        result.map(|()| {
            self.transfers
                .lock()
                .unwrap()
                .push((from.address(), *to, lamports));
            Signature::new_unique()
        })
    }

    async fn submit_transaction(&self, _tx: &Transaction) -> Result<Signature, SubmitError> {
        Ok(Signature::new_unique())
    }

    fn generate_address(&self) -> Pubkey {
        Pubkey::new_unique()
    }
}

/// Keeps every saved record so tests can inspect the write sequence.
#[derive(Default)]
pub struct MemoryProgressStore {
    pub initial: Mutex<Option<Progress>>,
    pub saves: Mutex<Vec<Progress>>,
}

impl MemoryProgressStore {
    pub fn with(progress: Progress) -> Self {
        Self {
            initial: Mutex::new(Some(progress)),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn saves(&self) -> Vec<Progress> {
        self.saves.lock().unwrap().clone()
    }

    pub fn last(&self) -> Progress {
        self.saves().last().cloned().expect("nothing saved")
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Result<Option<Progress>, StoreError> {
        Ok(self.initial.lock().unwrap().clone())
    }

    fn save(&self, progress: &Progress) -> Result<(), StoreError> {
        self.saves.lock().unwrap().push(progress.clone());
        Ok(())
    }
}

pub struct MockDaily {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl MockDaily {
    pub fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DailyOperations for MockDaily {
    async fn run_daily_operations(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(anyhow!("rewards API unreachable"))
        } else {
            Ok(())
        }
    }
}

pub fn keypairs(n: usize) -> Vec<Keypair> {
    (0..n).map(|_| Keypair::new()).collect()
}

pub fn secrets_for(keypairs: &[Keypair]) -> Vec<WalletSecret> {
    keypairs
        .iter()
        .map(|k| WalletSecret::new(k.to_base58_string()))
        .collect()
}

/// Fixed counts and amounts, short delays.
pub fn policy(tx_count: u32, amount_sol: f64) -> Policy {
    Policy {
        min_tx_count: tx_count,
        max_tx_count: tx_count,
        min_delay_ms: 4000,
        max_delay_ms: 15000,
        min_amount: amount_sol,
        max_amount: amount_sol,
        min_wallet_balance: 0.01,
        ..Policy::default()
    }
}
