use crate::resolver::DEFAULT_RESOLVER_CONCURRENCY;
use crate::search::DEFAULT_PAGE_SIZE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc_url: Option<String>,
    /// Transactions per page
    pub page_size: usize,
    /// Label lookups in flight at once
    pub resolver_concurrency: usize,
    /// Bound on cached labels; unbounded when unset
    pub label_cache_capacity: Option<usize>,
    pub block_poll_interval_secs: u64,
    pub recent_addresses: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: None,
            page_size: DEFAULT_PAGE_SIZE,
            resolver_concurrency: DEFAULT_RESOLVER_CONCURRENCY,
            label_cache_capacity: None,
            // ~1 block
            block_poll_interval_secs: 12,
            recent_addresses: Vec::new(),
        }
    }
}

impl Config {
    /// Returns the config directory path (~/.config/atex on Linux)
    fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("atex"))
            .context("Could not determine config directory")
    }

    /// Returns the config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {path:?}"))?;

        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config file")
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {dir:?}"))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {path:?}"))?;

        Ok(())
    }

    /// Set the RPC URL and persist
    pub fn set_rpc(&mut self, url: String) -> Result<()> {
        self.rpc_url = Some(url);
        self.save()
    }

    /// Remember a viewed address (keeps last 10, newest first). Does not save.
    pub fn add_recent_address(&mut self, address: String) {
        self.recent_addresses.retain(|s| s != &address);
        self.recent_addresses.insert(0, address);
        self.recent_addresses.truncate(10);
    }

    pub fn block_poll_interval(&self) -> Duration {
        Duration::from_secs(self.block_poll_interval_secs.max(1))
    }
}
