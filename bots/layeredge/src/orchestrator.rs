use crate::api::LayerEdgeApi;
use crate::client::HttpClient;
use crate::config::EdgeConfig;
use crate::ledger::PointsLedger;
use crate::monitor::AccountMonitor;
use crate::reporter::PointsReporter;
use crate::signer::AccountSigner;
use anyhow::Result;
use colored::Colorize;
use core_logic::{
    mask_hex, PrivateKey, ProxyConfig, ProxyManager, UserAgentManager, WalletManager, Worker,
    WorkerRunner,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Pause between bootstrap batches.
const BATCH_PAUSE: Duration = Duration::from_secs(3);

/// Builds one monitor per account, pairing proxies positionally with
/// the key list. Accounts beyond the proxy list run without one.
pub fn build_monitors(
    keys: &[PrivateKey],
    proxies: &[ProxyConfig],
    user_agents: Arc<UserAgentManager>,
    ledger: &PointsLedger,
    config: &EdgeConfig,
) -> Result<Vec<AccountMonitor>> {
    let mut monitors = Vec::with_capacity(keys.len());

    for (i, key) in keys.iter().enumerate() {
        let signer = Arc::new(AccountSigner::new(key)?);
        let proxy = proxies.get(i);
        if let Some(p) = proxy {
            info!(
                "Assigned proxy {} to wallet {}",
                p.url,
                signer.masked_address()
            );
        }

        let client = HttpClient::new(proxy, config.retry_times, Arc::clone(&user_agents))?;
        let api = Arc::new(LayerEdgeApi::new(client, Arc::clone(&signer)));

        monitors.push(AccountMonitor::new(
            signer.address().to_string(),
            api,
            ledger.clone(),
            config.clone(),
        ));
    }

    Ok(monitors)
}

/// Runs the one-time bootstrap sweep in batches of `batch_size`: each
/// batch runs concurrently and must finish entirely (success or
/// failure, both recorded) before the next one is admitted after a
/// fixed pause. Returns (address, succeeded) per account, in input
/// order within each batch.
pub async fn bootstrap_pass(
    monitors: &[AccountMonitor],
    batch_size: usize,
) -> Vec<(String, bool)> {
    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(monitors.len());
    let batch_count = monitors.len().div_ceil(batch_size);

    for (batch_no, batch) in monitors.chunks(batch_size).enumerate() {
        info!(
            "Bootstrapping batch {}/{} ({} accounts)",
            batch_no + 1,
            batch_count,
            batch.len()
        );

        let batch_results = join_all(batch.iter().map(|m| m.bootstrap())).await;
        results.extend(batch_results);

        if batch_no + 1 < batch_count {
            info!("Waiting 3 seconds before processing next batch...");
            tokio::time::sleep(BATCH_PAUSE).await;
        }
    }

    results
}

fn print_bootstrap_results(results: &[(String, bool)]) {
    println!("\n{}", "Initial Setup Results:".bold().cyan());
    for (address, success) in results {
        let status = if *success {
            "Success".green()
        } else {
            "Failed".red()
        };
        println!("{}: {}", mask_hex(address).cyan(), status);
    }
}

/// The claim/monitor flow: load resources, bootstrap every account in
/// batches, then run one monitor per account plus the points reporter
/// until the process is cancelled.
pub async fn run_monitor_flow(config: &EdgeConfig) -> Result<()> {
    let keys = WalletManager::load_accounts()?;
    let proxies = if config.use_proxy {
        ProxyManager::load_proxies()?
    } else {
        Vec::new()
    };
    let user_agents = Arc::new(UserAgentManager::load()?);
    let ledger = PointsLedger::new();

    let monitors = build_monitors(&keys, &proxies, user_agents, &ledger, config)?;

    let results = bootstrap_pass(&monitors, config.max_concurrent_tasks).await;
    print_bootstrap_results(&results);

    // Steady state: the batch ceiling no longer applies. Every account
    // gets a long-lived monitor, plus one reporter over the ledger.
    let mut workers: Vec<Box<dyn Worker>> = monitors
        .into_iter()
        .map(|m| Box::new(m) as Box<dyn Worker>)
        .collect();
    workers.push(Box::new(PointsReporter::new(ledger)));

    WorkerRunner::run_workers(workers).await
}
