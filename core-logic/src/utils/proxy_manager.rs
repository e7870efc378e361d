use crate::config::ProxyConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub struct ProxyManager;

impl ProxyManager {
    pub const PROXY_FILE: &'static str = "proxies.txt";

    /// Loads proxies from `path`, one `ip:port` or `ip:port:user:pass` per line.
    /// A missing file means no proxies.
    pub fn load_proxies(path: &Path) -> Result<Vec<ProxyConfig>> {
        if !path.exists() {
            info!("{} not found. Running without proxies.", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let proxies: Vec<ProxyConfig> = content.lines().filter_map(Self::parse_line).collect();

        info!("Loaded {} proxies from {}", proxies.len(), path.display());
        Ok(proxies)
    }

    pub fn parse_line(line: &str) -> Option<ProxyConfig> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 2 {
            warn!("Skipping invalid proxy line: {}", line);
            return None;
        }

        let (username, password) = if parts.len() >= 4 {
            (Some(parts[2].to_string()), Some(parts[3].to_string()))
        } else {
            (None, None)
        };

        Some(ProxyConfig {
            url: format!("http://{}:{}", parts[0], parts[1]),
            username,
            password,
        })
    }

    /// Round-robin pick for wallet `index`.
    pub fn for_wallet(proxies: &[ProxyConfig], index: usize) -> Option<&ProxyConfig> {
        if proxies.is_empty() {
            None
        } else {
            proxies.get(index % proxies.len())
        }
    }
}
