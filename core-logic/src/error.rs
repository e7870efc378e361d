//! # Core Error Types
//!
//! Typed errors at the core-logic boundary. Callers in the bot binary wrap
//! them in `anyhow` with context.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid range for '{field}': min {min} is greater than max {max}")]
    InvalidRange {
        field: String,
        min: String,
        max: String,
    },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Wallet secret and key derivation errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("No wallet secrets found in {source_desc}")]
    NoWallets { source_desc: String },

    #[error("Decryption failed for wallet at '{path}': {reason}")]
    DecryptionFailed { path: String, reason: String },

    #[error("Invalid wallet secret at index {index}: {reason}")]
    InvalidSecret { index: usize, reason: String },

    #[error("Keys file {path} is not a JSON array of strings: {reason}")]
    MalformedKeysFile { path: String, reason: String },
}

/// Database operation errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to open database {path}: {msg}")]
    OpenFailed { path: String, msg: String },

    #[error("Migration failed: {msg}")]
    MigrationFailed { msg: String },

    #[error("Query failed: {msg}")]
    QueryFailed { msg: String },
}

/// Security-related errors
#[derive(Error, Debug, Clone)]
pub enum SecurityError {
    #[error("Encryption/decryption failed: {reason}")]
    CryptographyFailed { reason: String },
}

/// Errors from durable JSON records (progress, policy)
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record in {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode record for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
