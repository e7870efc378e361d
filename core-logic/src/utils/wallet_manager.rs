use crate::config::WalletSource;
use crate::error::WalletError;
use crate::security::SecurityUtils;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use zeroize::Zeroize;

/// One wallet secret: a base58 private key or a seed phrase.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletSecret(String);

impl Drop for WalletSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl WalletSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Twelve or more whitespace separated words.
    pub fn is_seed_phrase(&self) -> bool {
        self.0.split_whitespace().count() >= 12
    }
}

impl fmt::Debug for WalletSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalletSecret(***REDACTED***)")
    }
}

#[derive(Deserialize)]
struct DecryptedWallet {
    #[serde(default)]
    mnemonic: String,
    #[serde(default)]
    sol_private_key: String,
}

impl Drop for DecryptedWallet {
    fn drop(&mut self) {
        self.mnemonic.zeroize();
        self.sol_private_key.zeroize();
    }
}

pub struct WalletManager;

impl WalletManager {
    pub const KEYS_FILE: &'static str = "privateKeys.json";
    pub const WALLETS_DIR: &'static str = "wallet-json";

    /// Loads the ordered secret list from `source`.
    ///
    /// A missing keys file is created as `[]` so the operator has something
    /// to fill in; an empty list is always an error.
    pub fn load_secrets(source: &WalletSource, password: Option<&str>) -> Result<Vec<WalletSecret>> {
        let secrets = match source {
            WalletSource::KeysFile { path } => Self::load_keys_file(path)?,
            WalletSource::EncryptedDir { path } => Self::load_encrypted_dir(path, password)?,
        };

        if secrets.is_empty() {
            let source_desc = match source {
                WalletSource::KeysFile { path } | WalletSource::EncryptedDir { path } => {
                    path.display().to_string()
                }
            };
            return Err(WalletError::NoWallets { source_desc }.into());
        }

        info!("Loaded {} wallet secrets", secrets.len());
        Ok(secrets)
    }

    /// Picks the keys file when it has entries, otherwise the encrypted
    /// wallet directory when it exists.
    pub fn detect_source(keys_file: &Path, wallets_dir: &Path) -> WalletSource {
        let keys_has_entries = fs::read_to_string(keys_file)
            .ok()
            .and_then(|content| serde_json::from_str::<Vec<Value>>(&content).ok())
            .is_some_and(|entries| !entries.is_empty());

        if !keys_has_entries && wallets_dir.is_dir() {
            info!(
                "{} has no keys, using encrypted wallets in {}",
                keys_file.display(),
                wallets_dir.display()
            );
            return WalletSource::EncryptedDir {
                path: wallets_dir.to_path_buf(),
            };
        }

        WalletSource::KeysFile {
            path: keys_file.to_path_buf(),
        }
    }

    fn load_keys_file(path: &Path) -> Result<Vec<WalletSecret>> {
        if !path.exists() {
            fs::write(path, "[]").with_context(|| format!("Failed to create {}", path.display()))?;
            warn!(
                "{} not found. Created an empty one, add your keys as a JSON array: [\"key1\", \"key2\"]",
                path.display()
            );
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let raw: Vec<String> =
            serde_json::from_str(&content).map_err(|e| WalletError::MalformedKeysFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Ok(raw
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(WalletSecret::new)
            .collect())
    }

    fn load_encrypted_dir(dir: &Path, password: Option<&str>) -> Result<Vec<WalletSecret>> {
        let mut entries: Vec<_> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read {}", dir.display()))?
            .filter_map(|res| res.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();

        info!("Found {} wallet files in {}", entries.len(), dir.display());

        let mut secrets = Vec::with_capacity(entries.len());
        for path in entries {
            let wallet = Self::decrypt_json_wallet(&path, password)?;
            let secret = if !wallet.sol_private_key.is_empty() {
                wallet.sol_private_key.clone()
            } else if !wallet.mnemonic.is_empty() {
                wallet.mnemonic.clone()
            } else {
                warn!("{} has no Solana key or mnemonic, skipping", path.display());
                continue;
            };
            secrets.push(WalletSecret::new(secret));
        }
        Ok(secrets)
    }

    fn decrypt_json_wallet(path: &Path, password: Option<&str>) -> Result<DecryptedWallet> {
        let content = fs::read_to_string(path)?;
        let json: Value = serde_json::from_str(&content)?;

        let encrypted = json.get("encrypted").filter(|v| v.is_object());
        let Some(block) = encrypted else {
            // Unencrypted wallet files carry the fields at the top level.
            return Ok(serde_json::from_value(json)?);
        };

        let pass = password.ok_or_else(|| WalletError::DecryptionFailed {
            path: path.display().to_string(),
            reason: "password required".to_string(),
        })?;
        let field = |name: &str| block.get(name).and_then(|v| v.as_str()).unwrap_or("");

        let decrypted = SecurityUtils::decrypt_components(
            field("ciphertext"),
            field("iv"),
            field("salt"),
            field("tag"),
            pass,
        )
        .map_err(|e| WalletError::DecryptionFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(serde_json::from_str(&decrypted)?)
    }
}
