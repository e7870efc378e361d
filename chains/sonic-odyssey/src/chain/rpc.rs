use super::{ChainClient, SubmitError};
use crate::wallet::WalletIdentity;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::MetricsCollector;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::time::{Duration, Instant};
use tracing::debug;

/// JSON-RPC client for the Sonic testnet, confirmed commitment.
pub struct SonicRpcClient {
    rpc: RpcClient,
}

impl SonicRpcClient {
    pub fn new(rpc_url: &str, timeout: Duration) -> Self {
        Self {
            rpc: RpcClient::new_with_timeout_and_commitment(
                rpc_url.to_string(),
                timeout,
                CommitmentConfig::confirmed(),
            ),
        }
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }

    async fn send_and_confirm(&self, tx: &Transaction) -> Result<Signature, SubmitError> {
        let started = Instant::now();
        let result = self.rpc.send_and_confirm_transaction(tx).await;
        MetricsCollector::global().record_rpc_latency(started.elapsed());

        result.map_err(|e| SubmitError::classify(e.to_string()))
    }
}

#[async_trait]
impl ChainClient for SonicRpcClient {
    async fn get_balance(&self, address: &Pubkey) -> Result<u64> {
        let started = Instant::now();
        let balance = self
            .rpc
            .get_balance(address)
            .await
            .with_context(|| format!("Failed to fetch balance of {}", address))?;
        MetricsCollector::global().record_rpc_latency(started.elapsed());
        Ok(balance)
    }

    async fn transfer(
        &self,
        from: &WalletIdentity,
        to: &Pubkey,
        lamports: u64,
    ) -> Result<Signature, SubmitError> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| SubmitError::classify(e.to_string()))?;

        let ix = system_instruction::transfer(&from.address(), to, lamports);
        let tx = Transaction::new_signed_with_payer(
            &[ix],
            Some(&from.address()),
            &[from.keypair()],
            blockhash,
        );

        debug!("Submitting transfer of {} lamports to {}", lamports, to);
        self.send_and_confirm(&tx).await
    }

    async fn submit_transaction(&self, tx: &Transaction) -> Result<Signature, SubmitError> {
        self.send_and_confirm(tx).await
    }

    fn generate_address(&self) -> Pubkey {
        Keypair::new().pubkey()
    }
}
