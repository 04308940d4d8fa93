use crate::error::WalletError;
use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A raw signing key loaded from disk.
///
/// The key material is zeroized on drop and never rendered in full:
/// `Debug` and `Display` both emit a masked prefix/suffix form.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(key: String) -> Result<Self, WalletError> {
        let hex_part = key.strip_prefix("0x").unwrap_or(&key);
        if hex_part.len() < 64 {
            return Err(WalletError::InvalidKeyLength {
                length: hex_part.len(),
            });
        }
        if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidKeyFormat);
        }
        Ok(Self(key))
    }

    /// Full key material, for handing to a signer. Do not log this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        mask_hex(&self.0)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&"***REDACTED***").finish()
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

/// Shortened `0x1234…abcd` rendering for addresses and keys in log lines.
pub fn mask_hex(value: &str) -> String {
    if value.len() <= 10 {
        return value.to_string();
    }
    format!("{}...{}", &value[..6], &value[value.len() - 4..])
}

pub struct WalletManager;

impl WalletManager {
    pub const ACCOUNTS_FILE: &'static str = "accounts.txt";
    pub const REGISTER_FILE: &'static str = "register.txt";

    /// Loads the monitored account keys. A missing or empty accounts
    /// file is fatal: there is nothing to run without credentials.
    pub fn load_accounts() -> Result<Vec<PrivateKey>> {
        let keys = Self::load_keys_from(Self::ACCOUNTS_FILE)?;
        if keys.is_empty() {
            return Err(WalletError::NoAccounts {
                path: Self::ACCOUNTS_FILE.to_string(),
            }
            .into());
        }
        tracing::info!("Loaded {} accounts from {}", keys.len(), Self::ACCOUNTS_FILE);
        Ok(keys)
    }

    /// Loads the registration-only key list. Missing file yields an
    /// empty list; the registration flow reports it to the user.
    pub fn load_register_accounts() -> Result<Vec<PrivateKey>> {
        if !Path::new(Self::REGISTER_FILE).exists() {
            tracing::warn!("{} not found", Self::REGISTER_FILE);
            return Ok(Vec::new());
        }
        Self::load_keys_from(Self::REGISTER_FILE)
    }

    /// Reads newline-delimited keys, skipping blanks and `#` comments.
    /// Malformed lines are skipped with a warning rather than aborting
    /// the whole list.
    pub fn load_keys_from(path: &str) -> Result<Vec<PrivateKey>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path))?;

        let mut keys = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match PrivateKey::new(trimmed.to_string()) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    tracing::warn!("Skipping {} line {}: {}", path, line_no + 1, e);
                }
            }
        }
        Ok(keys)
    }
}
