mod common;

use common::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use solana_sdk::signature::Keypair;
use sonic_odyssey::{
    AbandonReason, Progress, ProgressTracker, SubmitError, WalletIdentity,
    WalletTransactionRunner,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn runner(chain: &Arc<MockChain>) -> WalletTransactionRunner {
    let chain: Arc<dyn sonic_odyssey::ChainClient> = chain.clone();
    WalletTransactionRunner::new(chain).with_rng(StdRng::seed_from_u64(7))
}

fn tracker(store: &Arc<MemoryProgressStore>) -> ProgressTracker {
    ProgressTracker::open(store.clone(), "fp").unwrap()
}

fn wallet() -> WalletIdentity {
    WalletIdentity::from_keypair(0, Keypair::new())
}

#[tokio::test(start_paused = true)]
async fn test_low_starting_balance_skips_wallet() {
    let chain = Arc::new(MockChain::funded(SOL / 1000));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(5, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.abandoned, Some(AbandonReason::LowStartingBalance));
    assert_eq!(summary.attempted, 0);
    assert_eq!(chain.transfer_calls(), 0);
    assert_eq!(progress.wallet_index(), 1);
    assert_eq!(progress.transaction_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_balance_skips_wallet() {
    let chain = Arc::new(MockChain::new(None, Ok(())));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(5, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.abandoned, Some(AbandonReason::BalanceUnavailable));
    assert_eq!(progress.wallet_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sends_target_and_persists_each_attempt() {
    let chain = Arc::new(MockChain::funded(SOL));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);
    let wallet = wallet();

    let summary = runner(&chain)
        .run(&wallet, &policy(4, 0.002), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.target, 4);
    assert_eq!(summary.sent, 4);
    assert_eq!(summary.lamports_sent, 4 * 2_000_000);
    assert_eq!(summary.abandoned, None);

    let transfers = chain.transfers.lock().unwrap().clone();
    assert_eq!(transfers.len(), 4);
    assert!(transfers
        .iter()
        .all(|(from, _, lamports)| *from == wallet.address() && *lamports == 2_000_000));
    let recipients: HashSet<_> = transfers.iter().map(|(_, to, _)| *to).collect();
    assert_eq!(recipients.len(), 4);

    // open + one save per attempt + advance
    let saves = store.saves();
    assert_eq!(saves.len(), 6);
    let indices: Vec<u32> = saves[1..5].iter().map(|p| p.transaction_index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    assert_eq!(store.last().wallet_index, 1);
    assert_eq!(store.last().success_count, 4);
}

#[tokio::test(start_paused = true)]
async fn test_circuit_breaker_stops_after_ten_insufficient() {
    let chain = Arc::new(MockChain::new(
        Some(SOL),
        Err(SubmitError::InsufficientFunds("insufficient lamports".into())),
    ));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(20, 0.001), &mut progress)
        .await
        .unwrap();

    // insufficient funds are never retried
    assert_eq!(chain.transfer_calls(), 10);
    assert_eq!(summary.attempted, 10);
    assert_eq!(summary.insufficient_strikes, 10);
    assert_eq!(summary.last_transaction_index, 10);
    assert_eq!(summary.abandoned, Some(AbandonReason::CircuitBreaker));

    let saves = store.saves();
    assert_eq!(saves[saves.len() - 2].transaction_index, 10);
    assert_eq!(saves[saves.len() - 2].fail_count, 10);
    assert_eq!(progress.wallet_index(), 1);
    assert_eq!(progress.transaction_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_estimated_balance_floor_skips_chain() {
    // 0.01 SOL, 0.003 per send: 0.007 then 0.004 which is under the floor
    let chain = Arc::new(MockChain::funded(SOL / 100));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(5, 0.003), &mut progress)
        .await
        .unwrap();

    assert_eq!(chain.transfer_calls(), 2);
    assert_eq!(summary.sent, 2);
    assert_eq!(summary.insufficient_strikes, 3);
    assert_eq!(summary.abandoned, None);
}

#[tokio::test(start_paused = true)]
async fn test_resumes_at_persisted_transaction() {
    let chain = Arc::new(MockChain::funded(SOL));
    let store = Arc::new(MemoryProgressStore::with(Progress {
        transaction_index: 5,
        ..Progress::fresh("fp")
    }));
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(8, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(chain.transfer_calls(), 3);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.last_transaction_index, 8);
}

#[tokio::test(start_paused = true)]
async fn test_target_below_resume_index_sends_nothing() {
    let chain = Arc::new(MockChain::funded(SOL));
    let store = Arc::new(MemoryProgressStore::with(Progress {
        transaction_index: 12,
        ..Progress::fresh("fp")
    }));
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(8, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(chain.transfer_calls(), 0);
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.last_transaction_index, 12);
    assert_eq!(progress.wallet_index(), 1);
    assert_eq!(progress.transaction_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_is_retried_three_times() {
    let chain = Arc::new(MockChain::new(
        Some(SOL),
        Err(SubmitError::Network("connection reset".into())),
    ));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(2, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(chain.transfer_calls(), 6);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.insufficient_strikes, 0);
    assert_eq!(store.last().fail_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_within_attempt() {
    let chain = Arc::new(MockChain::funded(SOL));
    chain.script(vec![
        Err(SubmitError::Network("timed out".into())),
        Err(SubmitError::Network("timed out".into())),
    ]);
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(1, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(chain.transfer_calls(), 3);
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 0);
}

fn fixed_delay(tx_count: u32, amount_sol: f64, delay_ms: u64) -> sonic_odyssey::Policy {
    sonic_odyssey::Policy {
        min_delay_ms: delay_ms,
        max_delay_ms: delay_ms,
        ..policy(tx_count, amount_sol)
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_delay_after_last_transaction() {
    let chain = Arc::new(MockChain::funded(SOL));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let started = Instant::now();
    let summary = runner(&chain)
        .run(&wallet(), &fixed_delay(3, 0.001, 1000), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.sent, 3);
    assert_eq!(started.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_delays_stay_within_policy_range() {
    let chain = Arc::new(MockChain::funded(SOL));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);
    let policy = policy(5, 0.001);

    let started = Instant::now();
    runner(&chain)
        .run(&wallet(), &policy, &mut progress)
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // four gaps between five transfers
    assert!(elapsed >= Duration::from_millis(4 * policy.min_delay_ms));
    assert!(elapsed <= Duration::from_millis(4 * policy.max_delay_ms));
}

#[tokio::test(start_paused = true)]
async fn test_failed_send_is_spaced_five_seconds() {
    let chain = Arc::new(MockChain::new(
        Some(SOL),
        Err(SubmitError::Network("connection reset".into())),
    ));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let started = Instant::now();
    let summary = runner(&chain)
        .run(&wallet(), &fixed_delay(1, 0.001, 1000), &mut progress)
        .await
        .unwrap();

    assert_eq!(chain.transfer_calls(), 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_no_delay_after_breaker_trips() {
    let chain = Arc::new(MockChain::new(
        Some(SOL),
        Err(SubmitError::InsufficientFunds("insufficient lamports".into())),
    ));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let started = Instant::now();
    let summary = runner(&chain)
        .run(&wallet(), &fixed_delay(20, 0.001, 1000), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.abandoned, Some(AbandonReason::CircuitBreaker));
    // nine gaps between ten attempts, none after the tenth
    assert_eq!(started.elapsed(), Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn test_balance_just_under_minimum_is_skipped() {
    // min = max = 1 transaction, minimum balance 0.01 SOL, balance 0.009 SOL
    let chain = Arc::new(MockChain::funded(SOL / 100 - SOL / 1000));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(1, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.abandoned, Some(AbandonReason::LowStartingBalance));
    assert_eq!(summary.attempted, 0);
    assert_eq!(chain.transfer_calls(), 0);
    assert_eq!(progress.wallet_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_balance_equal_to_minimum_runs() {
    let chain = Arc::new(MockChain::funded(SOL / 100));
    let store = Arc::new(MemoryProgressStore::default());
    let mut progress = tracker(&store);

    let summary = runner(&chain)
        .run(&wallet(), &policy(1, 0.001), &mut progress)
        .await
        .unwrap();

    assert_eq!(summary.abandoned, None);
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(chain.transfer_calls(), 1);
}
