use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where wallet secrets come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WalletSource {
    /// Plain JSON array of base58 private keys or seed phrases.
    KeysFile { path: PathBuf },
    /// Directory of encrypted wallet JSON files.
    EncryptedDir { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}
