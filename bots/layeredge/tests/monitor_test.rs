use anyhow::Result;
use async_trait::async_trait;
use core_logic::{RequestError, Worker};
use layeredge_project::api::{ActionResult, ClaimOutcome, NodeApi, NodeStatus};
use layeredge_project::config::{ClaimWaitPolicy, EdgeConfig};
use layeredge_project::ledger::PointsLedger;
use layeredge_project::monitor::AccountMonitor;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ADDR_A: &str = "0xAAAA567890abcdef1234567890abcdef1234AAAA";
const ADDR_B: &str = "0xBBBB567890abcdef1234567890abcdef1234BBBB";

/// Scripted stand-in for the remote service. Every call is appended to
/// a (shareable) log as `"{tag}:{method}"`; responses come from
/// per-method queues with a default once the queue is drained.
#[derive(Default)]
struct Script {
    node_running: bool,
    fail_all: bool,
    start_results: VecDeque<bool>,
    default_start: bool,
    stop_results: VecDeque<bool>,
    default_stop: bool,
    claim_results: VecDeque<ClaimOutcome>,
    default_claim_success: bool,
    points: Option<u64>,
}

struct FakeApi {
    tag: &'static str,
    calls: Arc<Mutex<Vec<String>>>,
    script: Mutex<Script>,
}

impl FakeApi {
    fn new(tag: &'static str, script: Script) -> Arc<Self> {
        Arc::new(Self {
            tag,
            calls: Arc::new(Mutex::new(Vec::new())),
            script: Mutex::new(script),
        })
    }

    fn with_shared_log(
        tag: &'static str,
        script: Script,
        calls: Arc<Mutex<Vec<String>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            tag,
            calls,
            script: Mutex::new(script),
        })
    }

    fn log(&self, method: &str) {
        self.calls.lock().unwrap().push(format!("{}:{}", self.tag, method));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, method: &str) -> usize {
        let needle = format!("{}:{}", self.tag, method);
        self.calls.lock().unwrap().iter().filter(|c| **c == needle).count()
    }

    fn request_error(&self) -> anyhow::Error {
        anyhow::Error::from(RequestError::ConnectionFailed {
            endpoint: "fake".to_string(),
            reason: "scripted failure".to_string(),
        })
    }

    fn action(success: bool) -> ActionResult {
        ActionResult {
            success,
            message: if success {
                "node action executed successfully".to_string()
            } else {
                "node action rejected".to_string()
            },
        }
    }
}

#[async_trait]
impl NodeApi for FakeApi {
    async fn node_status(&self) -> Result<NodeStatus> {
        self.log("status");
        let script = self.script.lock().unwrap();
        if script.fail_all {
            return Err(self.request_error());
        }
        Ok(NodeStatus {
            start_timestamp: script.node_running.then_some(1_700_000_000),
        })
    }

    async fn start_node(&self) -> Result<ActionResult> {
        self.log("start");
        let mut script = self.script.lock().unwrap();
        if script.fail_all {
            return Err(self.request_error());
        }
        let success = script
            .start_results
            .pop_front()
            .unwrap_or(script.default_start);
        Ok(Self::action(success))
    }

    async fn stop_node(&self) -> Result<ActionResult> {
        self.log("stop");
        let mut script = self.script.lock().unwrap();
        if script.fail_all {
            return Err(self.request_error());
        }
        let success = script
            .stop_results
            .pop_front()
            .unwrap_or(script.default_stop);
        Ok(Self::action(success))
    }

    async fn claim(&self) -> Result<ClaimOutcome> {
        self.log("claim");
        let mut script = self.script.lock().unwrap();
        if script.fail_all {
            return Err(self.request_error());
        }
        Ok(script.claim_results.pop_front().unwrap_or_else(|| {
            if script.default_claim_success {
                ClaimOutcome::Claimed
            } else {
                ClaimOutcome::Rejected {
                    status: 500,
                    message: "scripted rejection".to_string(),
                }
            }
        }))
    }

    async fn wallet_points(&self) -> Result<Option<u64>> {
        self.log("points");
        let script = self.script.lock().unwrap();
        if script.fail_all {
            return Err(self.request_error());
        }
        Ok(script.points)
    }
}

fn config_with(check: u64, restart: u64) -> EdgeConfig {
    EdgeConfig {
        check_interval: check,
        restart_interval: restart,
        ..EdgeConfig::default()
    }
}

fn monitor(address: &str, api: Arc<FakeApi>, ledger: &PointsLedger, config: EdgeConfig) -> AccountMonitor {
    AccountMonitor::new(address.to_string(), api, ledger.clone(), config)
}

// --- bootstrap ---

#[tokio::test(start_paused = true)]
async fn bootstrap_starts_node_when_not_running() {
    let api = FakeApi::new(
        "a",
        Script {
            node_running: false,
            default_start: true,
            default_stop: true,
            default_claim_success: true,
            points: Some(100),
            ..Default::default()
        },
    );
    let ledger = PointsLedger::new();
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());

    let (address, success) = m.bootstrap().await;
    assert_eq!(address, ADDR_A);
    assert!(success);
    assert_eq!(
        api.calls(),
        vec!["a:points", "a:status", "a:start", "a:claim"]
    );
    // bootstrap's best-effort points fetch seeds the ledger
    assert_eq!(ledger.get(ADDR_A).await, Some(100));
}

#[tokio::test(start_paused = true)]
async fn bootstrap_recovers_with_stop_then_start() {
    let api = FakeApi::new(
        "a",
        Script {
            node_running: false,
            start_results: VecDeque::from([false, true]),
            default_stop: true,
            default_claim_success: true,
            ..Default::default()
        },
    );
    let ledger = PointsLedger::new();
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());

    let (_, success) = m.bootstrap().await;
    assert!(success);
    assert_eq!(
        api.calls(),
        vec!["a:points", "a:status", "a:start", "a:stop", "a:start", "a:claim"]
    );
}

#[tokio::test(start_paused = true)]
async fn bootstrap_skips_start_when_node_is_running() {
    let api = FakeApi::new(
        "a",
        Script {
            node_running: true,
            default_claim_success: true,
            ..Default::default()
        },
    );
    let ledger = PointsLedger::new();
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());

    let (_, success) = m.bootstrap().await;
    assert!(success);
    assert_eq!(api.count("start"), 0);
    assert_eq!(api.count("stop"), 0);
    assert_eq!(api.count("claim"), 1);
}

#[tokio::test(start_paused = true)]
async fn bootstrap_claims_exactly_once_even_when_already_claimed() {
    let api = FakeApi::new(
        "a",
        Script {
            node_running: true,
            claim_results: VecDeque::from([ClaimOutcome::AlreadyClaimed]),
            ..Default::default()
        },
    );
    let ledger = PointsLedger::new();
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());

    let (_, success) = m.bootstrap().await;
    // "already claimed within 24h" is an idempotent success
    assert!(success);
    assert_eq!(api.count("claim"), 1);
}

#[tokio::test(start_paused = true)]
async fn bootstrap_reports_failure_when_status_unreachable() {
    let api = FakeApi::new(
        "a",
        Script {
            fail_all: true,
            ..Default::default()
        },
    );
    let ledger = PointsLedger::new();
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());

    let (_, success) = m.bootstrap().await;
    assert!(!success);
}

// --- restart cycle ---

#[tokio::test(start_paused = true)]
async fn restart_requires_both_stop_and_start() {
    let ledger = PointsLedger::new();

    // stop fails: start must not even be attempted
    let api = FakeApi::new(
        "a",
        Script {
            stop_results: VecDeque::from([false]),
            default_start: true,
            ..Default::default()
        },
    );
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());
    assert!(!m.restart_cycle().await.unwrap());
    assert_eq!(api.count("stop"), 1);
    assert_eq!(api.count("start"), 0);

    // stop ok, start fails
    let api = FakeApi::new(
        "a",
        Script {
            default_stop: true,
            start_results: VecDeque::from([false]),
            ..Default::default()
        },
    );
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());
    assert!(!m.restart_cycle().await.unwrap());

    // both ok, strictly ordered stop -> start
    let api = FakeApi::new(
        "a",
        Script {
            default_stop: true,
            default_start: true,
            ..Default::default()
        },
    );
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, EdgeConfig::default());
    assert!(m.restart_cycle().await.unwrap());
    assert_eq!(api.calls(), vec!["a:stop", "a:start"]);
}

#[tokio::test(start_paused = true)]
async fn failed_restart_is_retried_on_later_cycles() {
    // stop succeeds but start keeps failing: the restart timer never
    // advances, so every cycle past the interval tries again.
    let api = FakeApi::new(
        "a",
        Script {
            node_running: true,
            default_stop: true,
            default_start: false,
            default_claim_success: true,
            ..Default::default()
        },
    );
    let ledger = PointsLedger::new();
    let m = monitor(ADDR_A, Arc::clone(&api), &ledger, config_with(1, 2));

    let token = CancellationToken::new();
    let handle = {
        let token = token.clone();
        let m = Arc::new(m);
        let m2 = Arc::clone(&m);
        tokio::spawn(async move { m2.run(token).await })
    };

    tokio::time::sleep(Duration::from_secs(30)).await;
    token.cancel();
    let stats = handle.await.unwrap().unwrap();

    assert!(api.count("stop") >= 2, "restart was not retried");
    assert_eq!(api.count("stop"), api.count("start"));
    assert!(stats.success > 0);
}

// --- wait policy ---

#[tokio::test(start_paused = true)]
async fn claim_outcome_policy_waits_by_result() {
    // failing claims + claim_fail_wait=10s: expect a claim roughly
    // every 10 seconds of (paused) time.
    let api = FakeApi::new(
        "a",
        Script {
            node_running: true,
            default_claim_success: false,
            ..Default::default()
        },
    );
    let ledger = PointsLedger::new();
    let config = EdgeConfig {
        claim_wait_policy: ClaimWaitPolicy::ClaimOutcome,
        claim_success_wait: 1000,
        claim_fail_wait: 10,
        check_interval: 1,
        restart_interval: 100_000,
        ..EdgeConfig::default()
    };
    let m = Arc::new(monitor(ADDR_A, Arc::clone(&api), &ledger, config));

    let token = CancellationToken::new();
    let handle = {
        let token = token.clone();
        let m = Arc::clone(&m);
        tokio::spawn(async move { m.run(token).await })
    };

    tokio::time::sleep(Duration::from_secs(35)).await;
    token.cancel();
    let _ = handle.await.unwrap().unwrap();

    let claims = api.count("claim");
    assert!((3..=5).contains(&claims), "expected ~4 claims, got {}", claims);
}

// --- isolation ---

#[tokio::test(start_paused = true)]
async fn one_failing_account_does_not_disturb_another() {
    let ledger = PointsLedger::new();

    let api_a = FakeApi::new(
        "a",
        Script {
            fail_all: true,
            ..Default::default()
        },
    );
    let api_b = FakeApi::new(
        "b",
        Script {
            node_running: true,
            default_claim_success: true,
            points: Some(200),
            ..Default::default()
        },
    );

    let m_a = Arc::new(monitor(ADDR_A, Arc::clone(&api_a), &ledger, config_with(1, 100_000)));
    let m_b = Arc::new(monitor(ADDR_B, Arc::clone(&api_b), &ledger, config_with(1, 100_000)));

    let (_, ok_a) = m_a.bootstrap().await;
    let (_, ok_b) = m_b.bootstrap().await;
    assert!(!ok_a);
    assert!(ok_b);

    let token = CancellationToken::new();
    let h_a = {
        let (token, m) = (token.clone(), Arc::clone(&m_a));
        tokio::spawn(async move { m.run(token).await })
    };
    let h_b = {
        let (token, m) = (token.clone(), Arc::clone(&m_b));
        tokio::spawn(async move { m.run(token).await })
    };

    tokio::time::sleep(Duration::from_secs(10)).await;
    token.cancel();
    let stats_a = h_a.await.unwrap().unwrap();
    let stats_b = h_b.await.unwrap().unwrap();

    // A only ever failed; B only ever succeeded.
    assert_eq!(stats_a.success, 0);
    assert!(stats_a.failed > 0);
    assert!(stats_b.success > 0);
    assert_eq!(stats_b.failed, 0);

    // B's ledger entry (seeded at bootstrap) is untouched by A.
    assert_eq!(ledger.get(ADDR_B).await, Some(200));
    assert_eq!(ledger.get(ADDR_A).await, None);
}

// --- bootstrap batching ---

#[tokio::test(start_paused = true)]
async fn batch_of_one_processes_accounts_strictly_in_order() {
    let shared_log = Arc::new(Mutex::new(Vec::new()));
    let ledger = PointsLedger::new();

    let script = || Script {
        node_running: true,
        default_claim_success: true,
        ..Default::default()
    };
    let api_a = FakeApi::with_shared_log("a", script(), Arc::clone(&shared_log));
    let api_b = FakeApi::with_shared_log("b", script(), Arc::clone(&shared_log));

    let monitors = vec![
        monitor(ADDR_A, Arc::clone(&api_a), &ledger, EdgeConfig::default()),
        monitor(ADDR_B, Arc::clone(&api_b), &ledger, EdgeConfig::default()),
    ];

    let results = layeredge_project::orchestrator::bootstrap_pass(&monitors, 1).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, ok)| *ok));

    // With a batch size of one, every call for account A lands before
    // any call for account B.
    let calls = shared_log.lock().unwrap().clone();
    let last_a = calls.iter().rposition(|c| c.starts_with("a:")).unwrap();
    let first_b = calls.iter().position(|c| c.starts_with("b:")).unwrap();
    assert!(last_a < first_b, "calls interleaved: {:?}", calls);
}
