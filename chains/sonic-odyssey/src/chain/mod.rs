//! Chain access used by the runner and the daily tasks.

pub mod rpc;

use crate::wallet::WalletIdentity;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use thiserror::Error;

pub use rpc::SonicRpcClient;

/// Submission failures, classified before any retry decision.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("{0}")]
    Other(String),
}

impl SubmitError {
    /// Sorts a raw client error message into a variant.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        const INSUFFICIENT: [&str; 4] = [
            "insufficient lamports",
            "insufficient funds",
            "custom program error: 0x1",
            "attempt to debit an account but found no record of a prior credit",
        ];
        const NETWORK: [&str; 8] = [
            "timeout",
            "timed out",
            "connection refused",
            "connection reset",
            "error sending request",
            "service unavailable",
            "too many requests",
            "blockhash not found",
        ];

        if INSUFFICIENT.iter().any(|p| lower.contains(p)) {
            SubmitError::InsufficientFunds(message)
        } else if NETWORK.iter().any(|p| lower.contains(p)) {
            SubmitError::Network(message)
        } else {
            SubmitError::Other(message)
        }
    }

    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, SubmitError::InsufficientFunds(_))
    }
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64>;

    /// Native transfer signed by `from`, confirmed before returning.
    async fn transfer(
        &self,
        from: &WalletIdentity,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, SubmitError>;

    /// Sends an already signed transaction and waits for confirmation.
    async fn submit_transaction(&self, tx: &Transaction) -> Result<Signature, SubmitError>;

    /// A fresh recipient address nobody holds the key for.
    fn generate_address(&self) -> Pubkey;
}

/// Decodes a base64 bincode transaction handed out by the rewards API.
pub fn decode_transaction(encoded: &str) -> Result<Transaction> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("Transaction is not valid base64")?;
    bincode::deserialize(&bytes).context("Transaction bytes do not decode")
}

/// Adds the wallet's signature, keeping any signatures already present.
pub fn sign_partial(tx: &mut Transaction, wallet: &WalletIdentity) -> Result<()> {
    let blockhash = tx.message.recent_blockhash;
    tx.try_partial_sign(&[wallet.keypair()], blockhash)
        .context("Wallet is not a signer of this transaction")
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::signature::{Keypair, Signer};
    use solana_sdk::system_instruction;

    #[test]
    fn test_classify_insufficient_funds() {
        let raw = "RPC response error -32002: Transaction simulation failed: Error processing Instruction 0: custom program error: 0x1";
        assert!(SubmitError::classify(raw).is_insufficient_funds());
        assert!(SubmitError::classify("Transfer: insufficient lamports 100, need 200")
            .is_insufficient_funds());
    }

    #[test]
    fn test_classify_network_and_other() {
        assert!(matches!(
            SubmitError::classify("error sending request for url (https://api.testnet.sonic.game/)"),
            SubmitError::Network(_)
        ));
        assert!(matches!(
            SubmitError::classify("invalid account data for instruction"),
            SubmitError::Other(_)
        ));
    }

    #[test]
    fn test_api_transaction_gets_wallet_signature() {
        let fee_payer = Keypair::new();
        let wallet = WalletIdentity::from_keypair(0, Keypair::new());
        let ix = system_instruction::transfer(&wallet.address(), &fee_payer.pubkey(), 1);
        let mut server_tx = Transaction::new_with_payer(&[ix], Some(&fee_payer.pubkey()));
        server_tx.partial_sign(&[&fee_payer], Hash::new_unique());
        let encoded = STANDARD.encode(bincode::serialize(&server_tx).unwrap());

        let mut tx = decode_transaction(&encoded).unwrap();
        assert!(!tx.is_signed());
        sign_partial(&mut tx, &wallet).unwrap();

        assert!(tx.is_signed());
        assert!(tx.verify().is_ok());
    }

    #[test]
    fn test_foreign_transaction_is_rejected() {
        let payer = Keypair::new();
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        let mut tx = Transaction::new_with_payer(&[ix], Some(&payer.pubkey()));
        tx.message.recent_blockhash = Hash::new_unique();

        let stranger = WalletIdentity::from_keypair(0, Keypair::new());
        assert!(sign_partial(&mut tx, &stranger).is_err());
    }
}
