//! Wallet identities derived from stored secrets.

use core_logic::{WalletError, WalletSecret};
use solana_sdk::derivation_path::DerivationPath;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::signer::keypair::{
    generate_seed_from_seed_phrase_and_passphrase, keypair_from_seed_and_derivation_path,
};
use std::fmt;

/// Signing handle for one wallet. Never persisted.
pub struct WalletIdentity {
    index: usize,
    keypair: Keypair,
}

impl WalletIdentity {
    /// Accepts a base58 64-byte secret key or a seed phrase (derived along
    /// `m/44'/501'/0'/0'`, the path Phantom and Backpack use).
    pub fn derive(index: usize, secret: &WalletSecret) -> Result<Self, WalletError> {
        let invalid = |reason: String| WalletError::InvalidSecret { index, reason };

        let keypair = if secret.is_seed_phrase() {
            let seed = generate_seed_from_seed_phrase_and_passphrase(secret.expose(), "");
            keypair_from_seed_and_derivation_path(
                &seed,
                Some(DerivationPath::new_bip44(Some(0), Some(0))),
            )
            .map_err(|e| invalid(e.to_string()))?
        } else {
            let bytes = bs58::decode(secret.expose().trim())
                .into_vec()
                .map_err(|e| invalid(format!("not base58: {}", e)))?;
            Keypair::from_bytes(&bytes).map_err(|e| invalid(e.to_string()))?
        };

        Ok(Self { index, keypair })
    }

    pub fn from_keypair(index: usize, keypair: Keypair) -> Self {
        Self { index, keypair }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn sign_message(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }
}

impl fmt::Debug for WalletIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletIdentity")
            .field("index", &self.index)
            .field("address", &self.address())
            .finish()
    }
}
