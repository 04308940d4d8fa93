//! # Core Logic - Shared Utilities for Account Automation
//!
//! This crate provides shared utilities used by the bot crates:
//! credential and proxy loading, retry/backoff, logging, and the
//! worker runner that fans accounts out as concurrent tasks.
//!
//! ## Modules
//!
//! - [`config`] - Shared configuration structures
//! - [`error`] - Typed error handling with thiserror
//! - [`traits`] - Core trait definitions
//! - [`utils`] - Utility modules (wallets, proxies, user agents, retry, logging)

// Module declarations - internal modules marked pub(crate)
pub mod config;
pub mod error;
pub mod traits;
pub(crate) mod utils;

// Selective exports - only public API types
pub use config::ProxyConfig;
pub use error::{ConfigError, CoreError, RequestError, WalletError};
pub use traits::{Worker, WorkerStats};

// Utils are pub(crate) - only export specific public utilities
pub use utils::{
    mask_hex, setup_logger, PrivateKey, ProxyManager, UserAgentManager, WalletManager,
    WorkerRunner,
};

// Export retry utilities
pub use utils::retry::{with_retry, RetryConfig};
