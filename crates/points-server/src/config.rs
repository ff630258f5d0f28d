use std::net::SocketAddr;
use std::path::Path;

use points_ledger::LedgerConfig;
use points_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Requests served at once across all connections. Excess requests wait.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 256,
        }
    }
}

/// Full service configuration, as read from a TOML file.
///
/// ```toml
/// [server]
/// bind_addr = "0.0.0.0:8080"
/// max_connections = 512
///
/// [ledger]
/// lock_timeout_ms = 2000
/// cleanup = "deferred"
/// sweep_interval_ms = 30000
///
/// [store]
/// simulated_latency_ms = 0
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsConfig {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub store: StoreConfig,
}

impl PointsConfig {
    /// Load from a TOML file. Missing sections and keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ServerResult<Self> {
        toml::from_str(content)
            .map_err(|e| ServerError::Config(format!("failed to parse config: {e}")))
    }

    /// Apply `POINTS_BIND_ADDR` and `POINTS_LOCK_TIMEOUT_MS` overrides.
    pub fn apply_env(self) -> ServerResult<Self> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        if let Some(addr) = var("POINTS_BIND_ADDR") {
            self.server.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("POINTS_BIND_ADDR {addr:?}: {e}")))?;
        }
        if let Some(ms) = var("POINTS_LOCK_TIMEOUT_MS") {
            let ms = ms
                .parse::<u64>()
                .map_err(|e| ServerError::Config(format!("POINTS_LOCK_TIMEOUT_MS {ms:?}: {e}")))?;
            self.ledger.lock_timeout_ms = Some(ms);
        }
        Ok(self)
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}
