use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const FALLBACK_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

/// Pool of browser user-agent strings, sampled uniformly per request so
/// one account's calls do not all present the same fingerprint.
pub struct UserAgentManager {
    agents: Vec<String>,
}

impl UserAgentManager {
    pub const UA_FILE: &'static str = "ua.txt";

    pub fn load() -> Result<Self> {
        let path = Path::new(Self::UA_FILE);
        if !path.exists() {
            warn!("{} not found. Using the built-in user agent.", Self::UA_FILE);
            return Ok(Self { agents: Vec::new() });
        }

        let content = fs::read_to_string(path).context("Failed to read ua.txt")?;
        let agents: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string)
            .collect();

        info!("Loaded {} user agents from {}", agents.len(), Self::UA_FILE);
        Ok(Self { agents })
    }

    pub fn from_agents(agents: Vec<String>) -> Self {
        Self { agents }
    }

    pub fn sample(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_UA)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
