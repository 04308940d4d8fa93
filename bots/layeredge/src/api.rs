use crate::client::HttpClient;
use crate::signer::{
    activation_message, claim_message, deactivation_message, now_millis, AccountSigner,
};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;

pub const API_BASE: &str = "https://referralapi.layeredge.io/api";

/// The exact message the service returns for a successful start/stop.
pub const ACTION_SUCCESS_MESSAGE: &str = "node action executed successfully";
pub const REGISTER_SUCCESS_MESSAGE: &str = "registered wallet address successfully";

/// Last reported liveness session of a node.
#[derive(Debug, Clone, Default)]
pub struct NodeStatus {
    pub start_timestamp: Option<i64>,
}

impl NodeStatus {
    pub fn is_running(&self) -> bool {
        self.start_timestamp.is_some()
    }
}

/// Outcome of a start/stop action after message interpretation.
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

/// Outcome of a daily claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// HTTP 405 with a "24 hours" message: the day's claim already
    /// happened, treated as success.
    AlreadyClaimed,
    Rejected { status: u16, message: String },
}

impl ClaimOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed | ClaimOutcome::AlreadyClaimed)
    }
}

/// Outcome of a referral registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    /// 4xx-style statusCode in the body; worth retrying after a pause.
    ClientRejected { message: String },
    Failed { message: String },
}

// --- response interpretation (pure) ---

pub(crate) fn interpret_action(body: &Value) -> ActionResult {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    ActionResult {
        success: message == ACTION_SUCCESS_MESSAGE,
        message,
    }
}

pub(crate) fn interpret_claim(status: u16, body: &Value) -> ClaimOutcome {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    if status < 400 {
        return ClaimOutcome::Claimed;
    }
    if status == 405 && message.contains("24 hours") {
        return ClaimOutcome::AlreadyClaimed;
    }
    ClaimOutcome::Rejected { status, message }
}

pub(crate) fn interpret_register(body: &Value) -> RegisterOutcome {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    if message == REGISTER_SUCCESS_MESSAGE {
        return RegisterOutcome::Registered;
    }

    let status_code = match body.get("statusCode") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    if status_code.starts_with('4') {
        RegisterOutcome::ClientRejected { message }
    } else {
        RegisterOutcome::Failed { message }
    }
}

pub(crate) fn parse_start_timestamp(body: &Value) -> Option<i64> {
    body.get("data")?.get("startTimestamp")?.as_i64()
}

pub(crate) fn parse_node_points(body: &Value) -> Option<u64> {
    body.get("data")?.get("nodePoints")?.as_u64()
}

/// Per-account view of the remote service. The state machine drives
/// this seam so tests can script responses without a network.
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn node_status(&self) -> Result<NodeStatus>;
    async fn start_node(&self) -> Result<ActionResult>;
    async fn stop_node(&self) -> Result<ActionResult>;
    async fn claim(&self) -> Result<ClaimOutcome>;
    /// Current point balance, when the service exposes one.
    async fn wallet_points(&self) -> Result<Option<u64>>;
}

/// Real client against the referral API, one instance per account.
pub struct LayerEdgeApi {
    client: HttpClient,
    signer: Arc<AccountSigner>,
}

impl LayerEdgeApi {
    pub fn new(client: HttpClient, signer: Arc<AccountSigner>) -> Self {
        Self { client, signer }
    }

    async fn node_action(&self, verb: &str, message: String, timestamp: u64) -> Result<ActionResult> {
        let signature = self.signer.sign(&message)?;
        let payload = json!({
            "timestamp": timestamp,
            "sign": signature,
        });

        let url = format!(
            "{}/light-node/node-action/{}/{}",
            API_BASE,
            self.signer.address(),
            verb
        );
        let body = self.client.execute(Method::POST, &url, Some(&payload)).await?;
        Ok(interpret_action(&body))
    }
}

#[async_trait]
impl NodeApi for LayerEdgeApi {
    async fn node_status(&self) -> Result<NodeStatus> {
        let url = format!(
            "{}/light-node/node-status/{}",
            API_BASE,
            self.signer.address()
        );
        let body = self.client.execute(Method::GET, &url, None).await?;
        Ok(NodeStatus {
            start_timestamp: parse_start_timestamp(&body),
        })
    }

    async fn start_node(&self) -> Result<ActionResult> {
        let timestamp = now_millis();
        let message = activation_message(self.signer.address(), timestamp);
        self.node_action("start", message, timestamp).await
    }

    async fn stop_node(&self) -> Result<ActionResult> {
        let timestamp = now_millis();
        let message = deactivation_message(self.signer.address(), timestamp);
        self.node_action("stop", message, timestamp).await
    }

    async fn claim(&self) -> Result<ClaimOutcome> {
        let timestamp = now_millis();
        let message = claim_message(self.signer.address(), timestamp);
        let signature = self.signer.sign(&message)?;

        let payload = json!({
            "walletAddress": self.signer.address(),
            "timestamp": timestamp,
            "sign": signature,
        });

        let url = format!("{}/light-node/claim-node-points", API_BASE);
        let (status, body) = self.client.post_raw(&url, &payload).await?;
        Ok(interpret_claim(status.as_u16(), &body))
    }

    async fn wallet_points(&self) -> Result<Option<u64>> {
        let url = format!(
            "{}/referral/wallet-details/{}",
            API_BASE,
            self.signer.address()
        );
        let body = self.client.execute(Method::GET, &url, None).await?;
        Ok(parse_node_points(&body))
    }
}

/// Registration-flow view of the remote service, separate from the
/// monitoring seam: only the referral endpoints.
#[async_trait]
pub trait ReferralApi: Send + Sync {
    async fn verify_referral(&self, invite_code: &str) -> Result<bool>;
    async fn register_wallet(&self, invite_code: &str) -> Result<RegisterOutcome>;
}

#[async_trait]
impl ReferralApi for LayerEdgeApi {
    /// Checks an invite code ahead of a registration sweep.
    async fn verify_referral(&self, invite_code: &str) -> Result<bool> {
        let url = format!("{}/referral/verify-referral-code", API_BASE);
        let payload = json!({ "invite_code": invite_code });
        let body = self.client.execute(Method::POST, &url, Some(&payload)).await?;
        Ok(body
            .get("data")
            .and_then(|d| d.get("valid"))
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn register_wallet(&self, invite_code: &str) -> Result<RegisterOutcome> {
        let url = format!("{}/referral/register-wallet/{}", API_BASE, invite_code);
        let payload = json!({ "walletAddress": self.signer.address() });
        let body = self.client.execute(Method::POST, &url, Some(&payload)).await?;
        Ok(interpret_register(&body))
    }
}
