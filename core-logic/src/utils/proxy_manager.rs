use crate::config::ProxyConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct ProxyManager;

impl ProxyManager {
    pub const PROXY_FILE: &'static str = "proxy.txt";

    /// Loads proxies from proxy.txt, one per line, positionally 1:1
    /// with the account list. Accepted formats:
    ///   scheme://user:pass@ip:port
    ///   ip:port:username:password
    ///   ip:port
    pub fn load_proxies() -> Result<Vec<ProxyConfig>> {
        let path = Path::new(Self::PROXY_FILE);
        if !path.exists() {
            warn!("{} not found. Running without proxies.", Self::PROXY_FILE);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).context("Failed to read proxy.txt")?;
        let mut proxies = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match Self::parse_line(line) {
                Some(proxy) => proxies.push(proxy),
                None => warn!("Skipping invalid proxy line: {}", line),
            }
        }

        info!("Loaded {} proxies from {}", proxies.len(), Self::PROXY_FILE);
        Ok(proxies)
    }

    pub fn parse_line(line: &str) -> Option<ProxyConfig> {
        // Full URL form carries its own scheme and credentials.
        if line.contains("://") {
            return Some(ProxyConfig {
                url: line.to_string(),
                username: None,
                password: None,
            });
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 2 {
            return None;
        }

        // ip:port:user:pass -> 4 parts, ip:port -> 2 parts
        let url = format!("http://{}:{}", parts[0], parts[1]);
        let (username, password) = if parts.len() >= 4 {
            (Some(parts[2].to_string()), Some(parts[3].to_string()))
        } else {
            (None, None)
        };

        Some(ProxyConfig {
            url,
            username,
            password,
        })
    }
}
