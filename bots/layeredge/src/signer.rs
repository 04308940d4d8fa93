use anyhow::{Context, Result};
use core_logic::{mask_hex, PrivateKey};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Signature;
use ethers::utils::{hash_message, to_checksum};
use std::time::{SystemTime, UNIX_EPOCH};

/// Epoch milliseconds, as embedded in every signed action message.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Signatures are submitted in canonical `0x`-prefixed hex form no
/// matter what the signing backend returned. Idempotent.
pub fn normalize_signature(sig: &str) -> String {
    if sig.starts_with("0x") {
        sig.to_string()
    } else {
        format!("0x{}", sig)
    }
}

pub fn activation_message(address: &str, timestamp: u64) -> String {
    format!("Node activation request for {} at {}", address, timestamp)
}

pub fn deactivation_message(address: &str, timestamp: u64) -> String {
    format!("Node deactivation request for {} at {}", address, timestamp)
}

pub fn claim_message(address: &str, timestamp: u64) -> String {
    format!(
        "I am claiming my daily node point for {} at {}",
        address, timestamp
    )
}

/// One account's signing identity: the wallet plus its derived
/// checksummed address, stable for the process lifetime.
pub struct AccountSigner {
    wallet: LocalWallet,
    address: String,
}

impl AccountSigner {
    pub fn new(key: &PrivateKey) -> Result<Self> {
        let wallet: LocalWallet = key
            .expose()
            .parse()
            .context("Failed to parse private key")?;
        let address = to_checksum(&wallet.address(), None);
        Ok(Self { wallet, address })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn masked_address(&self) -> String {
        mask_hex(&self.address)
    }

    /// Signs `message` with the standard personal-message scheme and
    /// returns the normalized `0x`-hex signature.
    pub fn sign(&self, message: &str) -> Result<String> {
        let signature = self.sign_raw(message)?;
        Ok(normalize_signature(&hex::encode(signature.to_vec())))
    }

    fn sign_raw(&self, message: &str) -> Result<Signature> {
        let message_hash = hash_message(message);
        self.wallet
            .sign_hash(message_hash)
            .context("Failed to sign message")
    }
}
