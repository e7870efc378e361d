mod common;

use common::*;
use core_logic::WalletSecret;
use rand::rngs::StdRng;
use rand::SeedableRng;
use solana_sdk::signature::Signer;
use sonic_odyssey::{
    AbandonReason, BatchOrchestrator, ChainClient, DailyOperations, Progress, ProgressTracker,
    WalletTransactionRunner,
};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator(chain: &Arc<MockChain>, daily: &Arc<MockDaily>) -> BatchOrchestrator {
    let chain: Arc<dyn ChainClient> = chain.clone();
    let daily: Arc<dyn DailyOperations> = daily.clone();
    let runner = WalletTransactionRunner::new(chain).with_rng(StdRng::seed_from_u64(11));
    BatchOrchestrator::new(runner, daily)
}

#[tokio::test(start_paused = true)]
async fn test_batch_resumes_at_stored_wallet() {
    let keys = keypairs(3);
    let secrets = secrets_for(&keys);
    let chain = Arc::new(MockChain::funded(SOL));
    let daily = Arc::new(MockDaily::new(false));
    let store = Arc::new(MemoryProgressStore::with(Progress {
        wallet_index: 1,
        ..Progress::fresh("fp")
    }));
    let mut progress = ProgressTracker::open(store.clone(), "fp").unwrap();

    let started = tokio::time::Instant::now();
    let summary = orchestrator(&chain, &daily)
        .run_batch(&secrets, &policy(1, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.wallets.len(), 2);
    assert_eq!(summary.wallets[0].wallet_index, 1);
    assert_eq!(summary.total_sent, 2);
    assert!(summary.daily_operations_ok);
    assert_eq!(daily.calls(), 1);

    let senders: Vec<_> = chain
        .transfers
        .lock()
        .unwrap()
        .iter()
        .map(|(from, _, _)| *from)
        .collect();
    assert_eq!(senders, vec![keys[1].pubkey(), keys[2].pubkey()]);

    // one pause between the two wallets, none after the last
    assert_eq!(started.elapsed(), Duration::from_secs(60));

    let last = store.last();
    assert_eq!((last.wallet_index, last.transaction_index), (0, 0));
    assert_eq!(last.success_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_daily_failure_does_not_fail_batch() {
    let secrets = secrets_for(&keypairs(1));
    let chain = Arc::new(MockChain::funded(SOL));
    let daily = Arc::new(MockDaily::new(true));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = ProgressTracker::open(store.clone(), "fp").unwrap();

    let summary = orchestrator(&chain, &daily)
        .run_batch(&secrets, &policy(2, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(daily.calls(), 1);
    assert!(!summary.daily_operations_ok);
    assert_eq!(summary.total_sent, 2);
    assert_eq!(progress.wallet_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_secret_is_skipped() {
    let mut secrets = vec![WalletSecret::new("not-a-key")];
    secrets.extend(secrets_for(&keypairs(1)));
    let chain = Arc::new(MockChain::funded(SOL));
    let daily = Arc::new(MockDaily::new(false));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = ProgressTracker::open(store.clone(), "fp").unwrap();

    let summary = orchestrator(&chain, &daily)
        .run_batch(&secrets, &policy(1, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.wallets.len(), 2);
    assert_eq!(summary.wallets[0].abandoned, Some(AbandonReason::InvalidSecret));
    assert_eq!(summary.wallets[1].sent, 1);
    assert_eq!(chain.transfer_calls(), 1);

    let wallet_indices: Vec<usize> = store.saves().iter().map(|p| p.wallet_index).collect();
    assert!(wallet_indices.contains(&1));
    assert_eq!(progress.wallet_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_low_balance_wallets_are_counted_but_not_sent_from() {
    let keys = keypairs(2);
    let secrets = secrets_for(&keys);
    let chain = Arc::new(MockChain::funded(SOL));
    chain.set_balance(keys[0].pubkey(), 0);
    let daily = Arc::new(MockDaily::new(false));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = ProgressTracker::open(store.clone(), "fp").unwrap();

    let summary = orchestrator(&chain, &daily)
        .run_batch(&secrets, &policy(3, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(
        summary.wallets[0].abandoned,
        Some(AbandonReason::LowStartingBalance)
    );
    assert_eq!(summary.total_attempted, 3);
    assert_eq!(summary.total_sent, 3);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_secret_reports_stored_cursor() {
    let mut secrets = vec![WalletSecret::new("not-a-key")];
    secrets.extend(secrets_for(&keypairs(1)));
    let chain = Arc::new(MockChain::funded(SOL));
    let daily = Arc::new(MockDaily::new(false));
    let store = Arc::new(MemoryProgressStore::with(Progress {
        transaction_index: 7,
        ..Progress::fresh("fp")
    }));
    let mut progress = ProgressTracker::open(store.clone(), "fp").unwrap();

    let summary = orchestrator(&chain, &daily)
        .run_batch(&secrets, &policy(1, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.wallets[0].abandoned, Some(AbandonReason::InvalidSecret));
    assert_eq!(summary.wallets[0].last_transaction_index, 7);
    // the next wallet starts from its first transaction
    assert_eq!(summary.wallets[1].attempted, 1);
}
