use anyhow::Result;
use config::{Config, File};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Wait policy applied after each claim attempt in the monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClaimWaitPolicy {
    /// Sleep `check_interval` regardless of the claim outcome.
    #[default]
    Fixed,
    /// Sleep `claim_success_wait` after a successful claim and
    /// `claim_fail_wait` after a failed one.
    ClaimOutcome,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EdgeConfig {
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
    #[serde(default = "default_retry_times")]
    pub retry_times: u32,
    /// Seconds between monitoring cycles under the `fixed` policy.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    /// Seconds between scheduled stop/start restart cycles.
    #[serde(default = "default_restart_interval")]
    pub restart_interval: u64,
    #[serde(default = "default_claim_success_wait")]
    pub claim_success_wait: u64,
    #[serde(default = "default_claim_fail_wait")]
    pub claim_fail_wait: u64,
    /// Bootstrap batch size; steady-state monitoring is unbounded.
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,
    #[serde(default)]
    pub claim_wait_policy: ClaimWaitPolicy,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_use_proxy() -> bool {
    true
}
fn default_retry_times() -> u32 {
    3
}
fn default_check_interval() -> u64 {
    300
}
fn default_restart_interval() -> u64 {
    43_200
}
fn default_claim_success_wait() -> u64 {
    43_200
}
fn default_claim_fail_wait() -> u64 {
    10_800
}
fn default_max_concurrent_tasks() -> usize {
    5
}
fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            use_proxy: default_use_proxy(),
            retry_times: default_retry_times(),
            check_interval: default_check_interval(),
            restart_interval: default_restart_interval(),
            claim_success_wait: default_claim_success_wait(),
            claim_fail_wait: default_claim_fail_wait(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            claim_wait_policy: ClaimWaitPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl EdgeConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path))
            .build()?;

        let mut cfg: EdgeConfig = settings.try_deserialize().map_err(|e| anyhow::anyhow!(e))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Loads the configuration, falling back to defaults when the file
    /// is missing or malformed.
    pub fn load_or_default(path: &str) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Error loading config from {}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }

    fn sanitize(&mut self) {
        if self.retry_times == 0 {
            warn!("retry_times must be at least 1, clamping");
            self.retry_times = 1;
        }
        if self.max_concurrent_tasks == 0 {
            warn!("max_concurrent_tasks must be at least 1, clamping");
            self.max_concurrent_tasks = 1;
        }
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    pub fn restart_interval(&self) -> Duration {
        Duration::from_secs(self.restart_interval)
    }

    pub fn claim_success_wait(&self) -> Duration {
        Duration::from_secs(self.claim_success_wait)
    }

    pub fn claim_fail_wait(&self) -> Duration {
        Duration::from_secs(self.claim_fail_wait)
    }

    pub fn console_level(&self) -> tracing::Level {
        match self.log_level.to_ascii_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}
