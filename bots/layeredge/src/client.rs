use core_logic::{ProxyConfig, RequestError, RetryConfig, UserAgentManager};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
const DASHBOARD_ORIGIN: &str = "https://dashboard.layeredge.io";

/// What to do with a received response before handing it to the caller.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ResponseCheck {
    /// Parse and return; business-level status codes are the caller's
    /// problem.
    Accept,
    /// Upstream gateway hiccup, retry the attempt.
    RetryBadGateway,
    /// Body is not structured data (interstitial / challenge page),
    /// retry the attempt.
    RetryContentType(String),
}

pub(crate) fn check_response(status: StatusCode, content_type: Option<&str>) -> ResponseCheck {
    if status == StatusCode::BAD_GATEWAY {
        return ResponseCheck::RetryBadGateway;
    }
    match content_type {
        Some(ct) if ct.contains("application/json") => ResponseCheck::Accept,
        other => ResponseCheck::RetryContentType(other.unwrap_or("").to_string()),
    }
}

/// One account's HTTP session: its own connection pool, its own proxy,
/// and the shared user-agent pool sampled per call.
///
/// `execute` retries HTTP 502, non-JSON bodies and transport failures
/// with exponential backoff and surfaces exhaustion uniformly as
/// [`RequestError::RetriesExhausted`]. Everything else is returned
/// parsed for the caller to interpret.
pub struct HttpClient {
    client: reqwest::Client,
    retry: RetryConfig,
    user_agents: Arc<UserAgentManager>,
}

impl HttpClient {
    pub fn new(
        proxy: Option<&ProxyConfig>,
        retry_times: u32,
        user_agents: Arc<UserAgentManager>,
    ) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .default_headers(Self::default_headers());

        if let Some(proxy_conf) = proxy {
            let mut proxy = reqwest::Proxy::all(&proxy_conf.url)?;
            if let (Some(u), Some(p)) = (&proxy_conf.username, &proxy_conf.password) {
                proxy = proxy.basic_auth(u, p);
            }
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
            retry: RetryConfig::new(retry_times, 1000),
            user_agents,
        })
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "accept",
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("origin", HeaderValue::from_static(DASHBOARD_ORIGIN));
        headers.insert(
            "referer",
            HeaderValue::from_static("https://dashboard.layeredge.io/"),
        );
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
        headers
    }

    fn request(&self, method: Method, url: &str, body: Option<&Value>) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .header(USER_AGENT, self.user_agents.sample().to_string());
        if let Some(json) = body {
            req = req.json(json);
        }
        req
    }

    /// Executes one logical call with bounded retries and backoff,
    /// returning the parsed JSON body.
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, RequestError> {
        let attempts = self.retry.max_attempts;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.request(method.clone(), url, body).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let content_type = resp
                        .headers()
                        .get(CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);

                    match check_response(status, content_type.as_deref()) {
                        ResponseCheck::Accept => {
                            return resp.json::<Value>().await.map_err(|e| {
                                RequestError::InvalidBody {
                                    endpoint: url.to_string(),
                                    reason: e.to_string(),
                                }
                            });
                        }
                        ResponseCheck::RetryBadGateway => {
                            warn!(
                                "Bad Gateway from {}, retrying... ({}/{})",
                                url,
                                attempt + 1,
                                attempts
                            );
                            last_error = format!("HTTP {}", status.as_u16());
                        }
                        ResponseCheck::RetryContentType(ct) => {
                            warn!(
                                "Unexpected content type '{}' from {}, retrying... ({}/{})",
                                ct,
                                url,
                                attempt + 1,
                                attempts
                            );
                            last_error = format!("unexpected content type '{}'", ct);
                        }
                    }
                }
                Err(e) => {
                    let err = classify_transport(&e, url);
                    warn!(
                        "Request to {} failed, retrying... ({}/{}): {}",
                        url,
                        attempt + 1,
                        attempts,
                        err
                    );
                    last_error = err.to_string();
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.retry.delay_before(attempt)).await;
            }
        }

        Err(RequestError::RetriesExhausted {
            endpoint: url.to_string(),
            attempts,
            last_error,
        })
    }

    /// POST returning the raw status code with the parsed body, for
    /// callers that interpret business status codes themselves (the
    /// daily claim). Only transport failures are retried.
    pub async fn post_raw(
        &self,
        url: &str,
        body: &Value,
    ) -> Result<(StatusCode, Value), RequestError> {
        let attempts = self.retry.max_attempts;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.request(Method::POST, url, Some(body)).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let value =
                        resp.json::<Value>()
                            .await
                            .map_err(|e| RequestError::InvalidBody {
                                endpoint: url.to_string(),
                                reason: e.to_string(),
                            })?;
                    return Ok((status, value));
                }
                Err(e) => {
                    let err = classify_transport(&e, url);
                    warn!(
                        "Request to {} failed, retrying... ({}/{}): {}",
                        url,
                        attempt + 1,
                        attempts,
                        err
                    );
                    last_error = err.to_string();
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.retry.delay_before(attempt)).await;
            }
        }

        Err(RequestError::RetriesExhausted {
            endpoint: url.to_string(),
            attempts,
            last_error,
        })
    }
}

fn classify_transport(e: &reqwest::Error, endpoint: &str) -> RequestError {
    if e.is_timeout() {
        RequestError::Timeout {
            timeout_ms: ATTEMPT_TIMEOUT.as_millis() as u64,
            endpoint: endpoint.to_string(),
        }
    } else {
        RequestError::ConnectionFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
    }
}
