// src/config.rs

//! Manages server configuration: loading, defaults, and validation.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;

/// The server's runtime configuration.
///
/// Every field has a default so the binary can run with no configuration file
/// at all. A TOML file given via `--config` may override any subset of them.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    /// Address the TCP listener binds to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port the TCP listener binds to. `0` asks the OS for an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path of the append-only journal file.
    #[serde(default = "default_journal_path")]
    pub journal_path: String,
    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Upper bound on simultaneously tracked connections.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// Timeout for every intra-conversation socket read, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// A connection silent for longer than this is evicted by the prune sweep.
    #[serde(default = "default_dead_after_secs")]
    pub dead_after_secs: u64,
    /// Interval between prune sweeps, in milliseconds.
    #[serde(default = "default_prune_interval_ms")]
    pub prune_interval_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_journal_path() -> String {
    "default.chatjournal".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    1024
}
fn default_read_timeout_ms() -> u64 {
    200
}
fn default_dead_after_secs() -> u64 {
    20
}
fn default_prune_interval_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            journal_path: default_journal_path(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            read_timeout_ms: default_read_timeout_ms(),
            dead_after_secs: default_dead_after_secs(),
            prune_interval_ms: default_prune_interval_ms(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse TOML from '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.journal_path.trim().is_empty() {
            return Err(anyhow!("journal_path cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }
        if self.read_timeout_ms == 0 {
            return Err(anyhow!("read_timeout_ms cannot be 0"));
        }
        if self.dead_after_secs == 0 {
            return Err(anyhow!("dead_after_secs cannot be 0"));
        }
        if self.prune_interval_ms == 0 {
            return Err(anyhow!("prune_interval_ms cannot be 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_wire_contract() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.journal_path, "default.chatjournal");
        assert_eq!(config.dead_after_secs, 20);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str("port = 9000").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.read_timeout_ms, 200);
    }

    #[test]
    fn zero_prune_interval_is_rejected() {
        let config = Config {
            prune_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
