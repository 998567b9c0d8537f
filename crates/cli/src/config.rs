// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.fleet/config.toml`. Every field has a
//! default, so an empty file (or none at all) is a valid configuration:
//!
//! ```toml
//! remote_url = "ws://127.0.0.1:7890"
//! storage_key = "offline_operations_queue"
//!
//! [retry]
//! max_attempts = 5        # 0 retries forever
//! initial_backoff_ms = 1000
//! max_backoff_secs = 60
//!
//! [network]
//! probe_timeout_ms = 1500
//! probe_interval_ms = 5000
//! request_timeout_ms = 10000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::env;
use crate::error::{Error, Result};
use crate::sync::{PersistentQueueStore, RemoteConfig, RetryPolicy};

const DATA_DIR_NAME: &str = ".fleet";
const CONFIG_FILE_NAME: &str = "config.toml";
const STATE_DIR_NAME: &str = "state";
const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Project configuration stored in `.fleet/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WebSocket URL of the `fleet-remote` server.
    pub remote_url: String,
    /// Storage key of the persisted mutation queue.
    pub storage_key: String,
    pub retry: RetryConfig,
    pub network: NetworkConfig,
}

/// Replay retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Failed attempts before an item is dead-lettered. 0 retries forever.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_secs: u64,
}

/// Connectivity and request timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// How long a connectivity probe may take before the network counts as offline.
    pub probe_timeout_ms: u64,
    /// Interval between probes while watching.
    pub probe_interval_ms: u64,
    /// How long a write may wait for the server's answer.
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            remote_url: "ws://127.0.0.1:7890".to_string(),
            storage_key: PersistentQueueStore::DEFAULT_KEY.to_string(),
            retry: RetryConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 5,
            initial_backoff_ms: 1000,
            max_backoff_secs: 60,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            probe_timeout_ms: 1500,
            probe_interval_ms: 5000,
            request_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Creates a config pointing at `remote_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRemoteUrl`] unless the URL is `ws://` or `wss://`.
    pub fn with_remote(remote_url: String) -> Result<Self> {
        validate_remote_url(&remote_url)?;
        Ok(Config {
            remote_url,
            ..Config::default()
        })
    }

    /// Loads configuration from the given `.fleet/` directory.
    ///
    /// A missing config file yields the defaults.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        validate_remote_url(&config.remote_url)?;
        Ok(config)
    }

    /// Saves configuration to the given `.fleet/` directory.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let config_path = data_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Remote URL, with `FLEET_REMOTE_URL` taking precedence.
    pub fn effective_remote_url(&self) -> String {
        env::remote_url().unwrap_or_else(|| self.remote_url.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: Some(self.retry.max_attempts).filter(|&n| n > 0),
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_secs(self.retry.max_backoff_secs),
        }
    }

    /// Connection settings for the remote store.
    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig {
            url: self.effective_remote_url(),
            connect_timeout: self.probe_timeout(),
            request_timeout: Duration::from_millis(self.network.request_timeout_ms),
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.network.probe_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.network.probe_interval_ms)
    }
}

/// Checks that `url` is a WebSocket URL.
pub fn validate_remote_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("ws://")
        .or_else(|| url.strip_prefix("wss://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(Error::InvalidRemoteUrl(url.to_string())),
    }
}

/// Finds the `.fleet` directory, honoring `FLEET_DIR`.
pub fn find_data_dir() -> Result<PathBuf> {
    let start = std::env::current_dir()?;
    find_data_dir_from(&start, env::data_dir())
}

/// Finds the `.fleet` directory by walking up from `start`.
///
/// An `override_dir` is used as-is if it exists.
pub fn find_data_dir_from(start: &Path, override_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::NotInitialized)
        };
    }

    let mut current = start.to_path_buf();
    loop {
        let data_dir = current.join(DATA_DIR_NAME);
        if data_dir.is_dir() {
            return Ok(data_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

/// Directory holding the queue, dead letters and document cache.
pub fn state_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(STATE_DIR_NAME)
}

/// Initialize a new `.fleet` directory at the given path.
pub fn init_data_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let data_dir = path.join(DATA_DIR_NAME);

    if data_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(data_dir.display().to_string()));
    }

    fs::create_dir_all(state_dir(&data_dir))?;
    config.save(&data_dir)?;
    write_gitignore(&data_dir)?;

    Ok(data_dir)
}

/// Write a .gitignore file to the data directory.
///
/// Queued writes and the document cache are local to one machine.
pub fn write_gitignore(data_dir: &Path) -> Result<()> {
    let gitignore_path = data_dir.join(GITIGNORE_FILE_NAME);
    fs::write(
        &gitignore_path,
        "# Local queue, dead letters and document cache\nstate/\n",
    )?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
