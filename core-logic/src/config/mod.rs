use serde::{Deserialize, Serialize};

/// One upstream proxy, positionally bound to a single account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Proxy URL with credentials embedded, suitable for a client builder.
    pub fn authority_url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                if let Some(rest) = self.url.split_once("://") {
                    format!("{}://{}:{}@{}", rest.0, user, pass, rest.1)
                } else {
                    format!("http://{}:{}@{}", user, pass, self.url)
                }
            }
            _ => self.url.clone(),
        }
    }
}
