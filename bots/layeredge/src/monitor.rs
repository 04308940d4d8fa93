use crate::api::NodeApi;
use crate::config::{ClaimWaitPolicy, EdgeConfig};
use crate::ledger::PointsLedger;
use anyhow::Result;
use async_trait::async_trait;
use core_logic::{mask_hex, RequestError, Worker, WorkerStats};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

/// Pause between a successful stop and the follow-up start.
const RESTART_PAUSE: Duration = Duration::from_secs(5);
/// Cooldown after an unexpected error escapes a monitoring cycle.
const ERROR_COOLDOWN: Duration = Duration::from_secs(60);
/// Status/points poller cadence.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Long-lived driver for one account: bootstraps the node, keeps the
/// daily claim going, restarts the node registration on schedule and
/// feeds point observations into the ledger.
///
/// Every instance owns its account exclusively; nothing here touches
/// another account's state.
pub struct AccountMonitor {
    address: String,
    label: String,
    api: Arc<dyn NodeApi>,
    ledger: PointsLedger,
    config: EdgeConfig,
}

impl AccountMonitor {
    pub fn new(
        address: String,
        api: Arc<dyn NodeApi>,
        ledger: PointsLedger,
        config: EdgeConfig,
    ) -> Self {
        let label = mask_hex(&address);
        Self {
            address,
            label,
            api,
            ledger,
            config,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// One-time initialization sweep: best-effort points fetch, node
    /// status check with a start (and stop-then-start recovery) when no
    /// liveness session exists, then exactly one best-effort claim.
    ///
    /// Never blocks the account from entering steady-state monitoring;
    /// the returned flag only feeds the bootstrap summary.
    pub async fn bootstrap(&self) -> (String, bool) {
        match self.bootstrap_inner().await {
            Ok(()) => (self.address.clone(), true),
            Err(e) => {
                error!("[{}] Error processing account: {:#}", self.label, e);
                (self.address.clone(), false)
            }
        }
    }

    async fn bootstrap_inner(&self) -> Result<()> {
        match self.api.wallet_points().await {
            Ok(Some(points)) => {
                self.ledger.record(&self.address, points).await;
                info!("[{}] Current points: {}", self.label, points);
            }
            Ok(None) => {}
            Err(e) => warn!("[{}] Error getting wallet details: {:#}", self.label, e),
        }

        let status = self.api.node_status().await?;
        info!(
            "[{}] Node status: startTimestamp = {:?}",
            self.label, status.start_timestamp
        );

        if !status.is_running() {
            info!("[{}] Node not running, starting node", self.label);
            if !self.try_start().await? {
                warn!("[{}] Start failed, trying stop then start", self.label);
                self.try_stop().await?;
                sleep(RESTART_PAUSE).await;
                self.try_start().await?;
            }
        }

        if self.try_claim().await? {
            info!("[{}] Daily check-in successful", self.label);
        }

        Ok(())
    }

    /// One monitoring cycle: scheduled restart when due, then the
    /// daily claim attempt. Returns whether the claim succeeded.
    async fn cycle(&self, last_restart_time: &mut Instant) -> Result<bool> {
        if last_restart_time.elapsed() >= self.config.restart_interval() {
            info!("[{}] Scheduled node restart", self.label);
            if self.restart_cycle().await? {
                // Only a full stop+start pair counts as a restart; a
                // partial failure leaves the timer running so the next
                // cycle retries.
                *last_restart_time = Instant::now();
            }
        }

        let claimed = self.try_claim().await?;
        if claimed {
            info!("[{}] Daily check-in successful", self.label);
        }
        Ok(claimed)
    }

    /// One stop-then-start refresh of the node's liveness session.
    /// True only when both actions succeeded.
    pub async fn restart_cycle(&self) -> Result<bool> {
        info!("[{}] Stopping node", self.label);
        if !self.try_stop().await? {
            error!("[{}] Failed to stop node", self.label);
            return Ok(false);
        }
        info!("[{}] Node stopped for scheduled restart", self.label);

        sleep(RESTART_PAUSE).await;

        info!("[{}] Starting node", self.label);
        if !self.try_start().await? {
            error!("[{}] Failed to start node", self.label);
            return Ok(false);
        }
        info!("[{}] Node started successfully", self.label);
        Ok(true)
    }

    fn wait_after_claim(&self, claimed: bool) -> Duration {
        match self.config.claim_wait_policy {
            ClaimWaitPolicy::Fixed => self.config.check_interval(),
            ClaimWaitPolicy::ClaimOutcome => {
                if claimed {
                    self.config.claim_success_wait()
                } else {
                    self.config.claim_fail_wait()
                }
            }
        }
    }

    // Request-level failures are an expected outcome of every remote
    // call: log and report `false`. Anything else (signing failures,
    // bugs) bubbles up to the cycle's catch-all.
    async fn try_start(&self) -> Result<bool> {
        match self.api.start_node().await {
            Ok(result) if result.success => Ok(true),
            Ok(result) => {
                error!("[{}] Failed to start node: {}", self.label, result.message);
                Ok(false)
            }
            Err(e) => self.swallow_request_error("starting node", e),
        }
    }

    async fn try_stop(&self) -> Result<bool> {
        match self.api.stop_node().await {
            Ok(result) if result.success => Ok(true),
            Ok(result) => {
                error!("[{}] Failed to stop node: {}", self.label, result.message);
                Ok(false)
            }
            Err(e) => self.swallow_request_error("stopping node", e),
        }
    }

    async fn try_claim(&self) -> Result<bool> {
        use crate::api::ClaimOutcome;

        match self.api.claim().await {
            Ok(ClaimOutcome::Claimed) => Ok(true),
            Ok(ClaimOutcome::AlreadyClaimed) => {
                info!("[{}] Check-in is already done", self.label);
                Ok(true)
            }
            Ok(ClaimOutcome::Rejected { status, message }) => {
                warn!(
                    "[{}] Failed to claim points, status: {}, response: {}",
                    self.label, status, message
                );
                Ok(false)
            }
            Err(e) => self.swallow_request_error("claiming points", e),
        }
    }

    fn swallow_request_error(&self, action: &str, e: anyhow::Error) -> Result<bool> {
        if e.downcast_ref::<RequestError>().is_some() {
            error!("[{}] Error {}: {:#}", self.label, action, e);
            Ok(false)
        } else {
            Err(e)
        }
    }

    /// Status/points poller, spawned alongside the monitoring loop and
    /// torn down with it via the child token. Never exits on its own.
    async fn poll_loop(
        api: Arc<dyn NodeApi>,
        ledger: PointsLedger,
        address: String,
        label: String,
        token: CancellationToken,
    ) {
        loop {
            if token.is_cancelled() {
                break;
            }

            let outcome: Result<()> = async {
                let status = api.node_status().await?;
                if let Some(ts) = status.start_timestamp {
                    info!("[{}] Node status: startTimestamp = {}", label, ts);
                }

                // Sample wallet details roughly once a minute.
                if unix_seconds() % 60 == 0 {
                    if let Some(points) = api.wallet_points().await? {
                        let delta = ledger
                            .record(&address, points)
                            .await
                            .unwrap_or(points as i64);
                        if delta != 0 {
                            let old = points as i64 - delta;
                            let sign = if delta > 0 { "+" } else { "" };
                            info!(
                                "[{}] Points: {} -> {} ({}{})",
                                label, old, points, sign, delta
                            );
                        }
                    }
                }
                Ok(())
            }
            .await;

            if let Err(e) = outcome {
                error!("[{}] Error updating status and points: {:#}", label, e);
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = sleep(POLL_INTERVAL) => {}
            }
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl Worker for AccountMonitor {
    fn name(&self) -> String {
        self.label.clone()
    }

    async fn run(&self, cancellation_token: CancellationToken) -> Result<WorkerStats> {
        info!("[{}] Monitoring started", self.label);
        let mut stats = WorkerStats::default();

        let poller_token = cancellation_token.child_token();
        let poller = tokio::spawn(
            Self::poll_loop(
                Arc::clone(&self.api),
                self.ledger.clone(),
                self.address.clone(),
                self.label.clone(),
                poller_token.clone(),
            )
            .instrument(tracing::info_span!("poller", account = %self.label)),
        );

        let mut last_restart_time = Instant::now();

        loop {
            if cancellation_token.is_cancelled() {
                break;
            }

            let wait = match self.cycle(&mut last_restart_time).await {
                Ok(claimed) => {
                    if claimed {
                        stats.success += 1;
                    } else {
                        stats.failed += 1;
                    }
                    self.wait_after_claim(claimed)
                }
                Err(e) => {
                    error!("[{}] Error: {:#}", self.label, e);
                    ERROR_COOLDOWN
                }
            };

            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = sleep(wait) => {}
            }
        }

        // The poller lives exactly as long as its account's driver.
        poller_token.cancel();
        let _ = poller.await;

        info!("[{}] Monitoring stopped", self.label);
        Ok(stats)
    }
}
