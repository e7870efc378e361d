//! Resumable batch position, persisted after every transfer attempt.

use anyhow::Result;
use core_logic::{JsonFile, StoreError, WalletSecret};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Next wallet to work on.
    #[serde(rename = "currentWalletIndex")]
    pub wallet_index: usize,
    /// Next transaction index within that wallet.
    #[serde(rename = "currentTransactionIndex")]
    pub transaction_index: u32,
    #[serde(rename = "privateKeysHash")]
    pub keys_fingerprint: String,
    #[serde(rename = "successfulTransactions")]
    pub success_count: u64,
    #[serde(rename = "failedTransactions")]
    pub fail_count: u64,
}

impl Progress {
    pub fn fresh(keys_fingerprint: impl Into<String>) -> Self {
        Self {
            wallet_index: 0,
            transaction_index: 0,
            keys_fingerprint: keys_fingerprint.into(),
            success_count: 0,
            fail_count: 0,
        }
    }
}

/// Hex SHA-256 of the JSON-encoded secret list.
pub fn fingerprint(secrets: &[WalletSecret]) -> String {
    let exposed: Vec<&str> = secrets.iter().map(|s| s.expose()).collect();
    let encoded = serde_json::to_vec(&exposed).unwrap_or_default();
    hex::encode(Sha256::digest(&encoded))
}

pub trait ProgressStore: Send + Sync {
    fn load(&self) -> Result<Option<Progress>, StoreError>;
    fn save(&self, progress: &Progress) -> Result<(), StoreError>;
}

pub struct JsonProgressStore {
    file: JsonFile,
}

impl JsonProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
        }
    }
}

impl ProgressStore for JsonProgressStore {
    fn load(&self) -> Result<Option<Progress>, StoreError> {
        self.file.read()
    }

    fn save(&self, progress: &Progress) -> Result<(), StoreError> {
        self.file.write(progress)
    }
}

/// The single writer of [`Progress`]. Every mutation is persisted before it
/// returns.
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    state: Progress,
}

impl ProgressTracker {
    /// Loads the stored record, starting over when it is missing, unreadable
    /// or was written for a different wallet list.
    pub fn open(store: Arc<dyn ProgressStore>, keys_fingerprint: &str) -> Result<Self> {
        let state = match store.load() {
            Ok(Some(progress)) if progress.keys_fingerprint == keys_fingerprint => {
                info!(
                    "Resuming at wallet {}, transaction {} ({} sent, {} failed so far)",
                    progress.wallet_index + 1,
                    progress.transaction_index,
                    progress.success_count,
                    progress.fail_count
                );
                progress
            }
            Ok(Some(_)) => {
                info!("Wallet list changed, starting from the first wallet");
                Progress::fresh(keys_fingerprint)
            }
            Ok(None) => Progress::fresh(keys_fingerprint),
            Err(StoreError::Malformed { path, source }) => {
                warn!("{} is corrupt ({}), starting over", path, source);
                Progress::fresh(keys_fingerprint)
            }
            Err(e) => return Err(e.into()),
        };

        store.save(&state)?;
        Ok(Self { store, state })
    }

    pub fn current(&self) -> &Progress {
        &self.state
    }

    pub fn wallet_index(&self) -> usize {
        self.state.wallet_index
    }

    pub fn transaction_index(&self) -> u32 {
        self.state.transaction_index
    }

    fn persist(&self) -> Result<()> {
        self.store.save(&self.state)?;
        Ok(())
    }

    /// One attempt finished; `next_index` is the index to resume at.
    pub fn record_attempt(&mut self, next_index: u32, sent: bool) -> Result<()> {
        self.state.transaction_index = next_index;
        if sent {
            self.state.success_count += 1;
        } else {
            self.state.fail_count += 1;
        }
        self.persist()
    }

    /// Moves the cursor to the next wallet's first transaction.
    pub fn advance_wallet(&mut self) -> Result<()> {
        self.state.wallet_index += 1;
        self.state.transaction_index = 0;
        self.persist()
    }

    /// End of batch: back to the first wallet. Counters are kept.
    pub fn reset_cursor(&mut self) -> Result<()> {
        self.state.wallet_index = 0;
        self.state.transaction_index = 0;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets(keys: &[&str]) -> Vec<WalletSecret> {
        keys.iter().map(|k| WalletSecret::new(*k)).collect()
    }

    #[test]
    fn test_fingerprint_follows_content_and_order() {
        let a = fingerprint(&secrets(&["k1", "k2"]));
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(&secrets(&["k1", "k2"])));
        assert_ne!(a, fingerprint(&secrets(&["k2", "k1"])));
        assert_ne!(a, fingerprint(&secrets(&["k1", "k2", "k3"])));
    }

    #[test]
    fn test_changed_wallet_list_resets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonProgressStore::new(dir.path().join("progress.json")));
        store
            .save(&Progress {
                wallet_index: 4,
                transaction_index: 37,
                keys_fingerprint: "old".into(),
                success_count: 500,
                fail_count: 12,
            })
            .unwrap();

        let tracker = ProgressTracker::open(store.clone(), "new").unwrap();

        assert_eq!(tracker.current(), &Progress::fresh("new"));
        assert_eq!(store.load().unwrap(), Some(Progress::fresh("new")));
    }

    #[test]
    fn test_matching_fingerprint_resumes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonProgressStore::new(dir.path().join("progress.json")));
        let saved = Progress {
            wallet_index: 2,
            transaction_index: 9,
            keys_fingerprint: "same".into(),
            success_count: 30,
            fail_count: 1,
        };
        store.save(&saved).unwrap();

        let tracker = ProgressTracker::open(store, "same").unwrap();
        assert_eq!(tracker.current(), &saved);
    }

    #[test]
    fn test_corrupt_record_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{\"currentWalletIndex\": ").unwrap();

        let tracker =
            ProgressTracker::open(Arc::new(JsonProgressStore::new(&path)), "fp").unwrap();

        assert_eq!(tracker.current(), &Progress::fresh("fp"));
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("\"privateKeysHash\": \"fp\""));
    }

    #[test]
    fn test_second_write_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let store = JsonProgressStore::new(&path);
        let progress = Progress {
            wallet_index: 1,
            transaction_index: 3,
            keys_fingerprint: "abc".into(),
            success_count: 3,
            fail_count: 0,
        };

        store.save(&progress).unwrap();
        let first = std::fs::read(&path).unwrap();
        store.save(&progress).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_each_attempt_counts_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonProgressStore::new(dir.path().join("progress.json")));
        let mut tracker = ProgressTracker::open(store.clone(), "fp").unwrap();

        tracker.record_attempt(1, true).unwrap();
        tracker.record_attempt(2, false).unwrap();
        tracker.record_attempt(3, true).unwrap();

        let saved = store.load().unwrap().unwrap();
        assert_eq!(saved.transaction_index, 3);
        assert_eq!(saved.success_count, 2);
        assert_eq!(saved.fail_count, 1);

        tracker.advance_wallet().unwrap();
        let saved = store.load().unwrap().unwrap();
        assert_eq!((saved.wallet_index, saved.transaction_index), (1, 0));

        tracker.reset_cursor().unwrap();
        let saved = store.load().unwrap().unwrap();
        assert_eq!((saved.wallet_index, saved.transaction_index), (0, 0));
        assert_eq!(saved.success_count, 2);
    }
}
