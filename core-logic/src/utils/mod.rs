//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod json_file;
pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod wallet_manager;

pub use json_file::JsonFile;
pub use logger::{setup_logger, TX_RESULT_TARGET};
pub use proxy_manager::ProxyManager;
pub use wallet_manager::{WalletManager, WalletSecret};
