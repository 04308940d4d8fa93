use crate::api::{LayerEdgeApi, ReferralApi, RegisterOutcome};
use crate::client::HttpClient;
use crate::config::EdgeConfig;
use crate::signer::AccountSigner;
use anyhow::{Context, Result};
use colored::Colorize;
use core_logic::{ProxyManager, UserAgentManager, WalletManager};
use dialoguer::{theme::ColorfulTheme, Input};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const RESULTS_FILE: &str = "ref_result.txt";

const REGISTER_ATTEMPTS: u32 = 3;
const REGISTER_RETRY_PAUSE: Duration = Duration::from_secs(5);
const BATCH_PAUSE: Duration = Duration::from_secs(10);

/// Registers one wallet, retrying client-side rejections and request
/// failures a few times before giving up. Hard business failures stop
/// immediately.
pub async fn register_with_retry(
    api: &dyn ReferralApi,
    label: &str,
    invite_code: &str,
) -> bool {
    for attempt in 0..REGISTER_ATTEMPTS {
        match api.register_wallet(invite_code).await {
            Ok(RegisterOutcome::Registered) => {
                info!("[{}] Wallet registered successfully", label);
                return true;
            }
            Ok(RegisterOutcome::ClientRejected { message }) => {
                if attempt + 1 < REGISTER_ATTEMPTS {
                    warn!(
                        "[{}] Registration rejected (attempt {}/{}), retrying in 5s: {}",
                        label,
                        attempt + 1,
                        REGISTER_ATTEMPTS,
                        message
                    );
                    tokio::time::sleep(REGISTER_RETRY_PAUSE).await;
                } else {
                    error!(
                        "[{}] Registration failed after {} attempts: {}",
                        label, REGISTER_ATTEMPTS, message
                    );
                }
            }
            Ok(RegisterOutcome::Failed { message }) => {
                error!("[{}] Registration failed: {}", label, message);
                return false;
            }
            Err(e) => {
                if attempt + 1 < REGISTER_ATTEMPTS {
                    warn!(
                        "[{}] Registration request error (attempt {}/{}): {:#}",
                        label,
                        attempt + 1,
                        REGISTER_ATTEMPTS,
                        e
                    );
                    tokio::time::sleep(REGISTER_RETRY_PAUSE).await;
                } else {
                    error!(
                        "[{}] Registration failed after {} attempts: {:#}",
                        label, REGISTER_ATTEMPTS, e
                    );
                }
            }
        }
    }
    false
}

async fn process_registration(
    api: &dyn ReferralApi,
    label: &str,
    invite_code: &str,
) -> bool {
    match api.verify_referral(invite_code).await {
        Ok(true) => {}
        Ok(false) => {
            error!("[{}] Invite code {} is not valid", label, invite_code);
            return false;
        }
        Err(e) => {
            error!("[{}] Error verifying invite code: {:#}", label, e);
            return false;
        }
    }

    register_with_retry(api, label, invite_code).await
}

/// Writes the per-account outcome file consumed by the operator.
pub fn write_results(path: &str, results: &[(String, bool)]) -> Result<()> {
    let mut out = String::new();
    for (address, success) in results {
        let status = if *success { "Success" } else { "Failed" };
        out.push_str(&format!("{}: {}\n", address, status));
    }
    std::fs::write(path, out).with_context(|| format!("Failed to write {}", path))
}

/// The registration flow: prompt for an invite code, sweep the
/// register-only key list in batches, persist the outcomes.
pub async fn run_registration_flow(config: &EdgeConfig) -> Result<()> {
    let keys = WalletManager::load_register_accounts()?;
    if keys.is_empty() {
        println!("{}", "No accounts found to register".red());
        return Ok(());
    }

    let invite_code: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Enter invite code")
        .interact_text()
        .context("Cannot prompt for invite code (not a terminal)")?;
    let invite_code = invite_code.trim().to_string();
    if invite_code.is_empty() {
        println!("{}", "Invite code cannot be empty".red());
        return Ok(());
    }

    // Registration reuses one proxy for the whole sweep.
    let proxies = if config.use_proxy {
        ProxyManager::load_proxies()?
    } else {
        Vec::new()
    };
    let shared_proxy = proxies.first();
    let user_agents = Arc::new(UserAgentManager::load()?);

    let mut accounts = Vec::with_capacity(keys.len());
    for key in &keys {
        let signer = Arc::new(AccountSigner::new(key)?);
        let client = HttpClient::new(shared_proxy, config.retry_times, Arc::clone(&user_agents))?;
        let api = LayerEdgeApi::new(client, Arc::clone(&signer));
        accounts.push((signer, api));
    }

    println!("{}", "Processing registrations...".cyan());

    let batch_size = config.max_concurrent_tasks.max(1);
    let batch_count = accounts.len().div_ceil(batch_size);
    let mut results: Vec<(String, bool)> = Vec::with_capacity(accounts.len());

    for (batch_no, batch) in accounts.chunks(batch_size).enumerate() {
        println!(
            "{}",
            format!(
                "Processing batch {}/{} ({} accounts)",
                batch_no + 1,
                batch_count,
                batch.len()
            )
            .yellow()
        );

        let batch_results = futures::future::join_all(batch.iter().map(|(signer, api)| async {
            let success =
                process_registration(api, &signer.masked_address(), &invite_code).await;
            let status = if success {
                "Success".green()
            } else {
                "Failed".red()
            };
            println!("{}: {}", signer.masked_address().cyan(), status);
            (signer.address().to_string(), success)
        }))
        .await;

        let batch_success = batch_results.iter().filter(|(_, ok)| *ok).count();
        println!(
            "{}",
            format!("Batch complete: {}/{} succeeded", batch_success, batch.len()).cyan()
        );
        results.extend(batch_results);

        if batch_no + 1 < batch_count {
            println!("{}", "Waiting 10 seconds before next batch...".yellow());
            tokio::time::sleep(BATCH_PAUSE).await;
        }
    }

    write_results(RESULTS_FILE, &results)?;
    let total_success = results.iter().filter(|(_, ok)| *ok).count();
    println!(
        "\n{}",
        format!(
            "All registrations processed: {}/{} succeeded. Results saved to {}",
            total_success,
            results.len(),
            RESULTS_FILE
        )
        .bold()
        .cyan()
    );

    Ok(())
}
