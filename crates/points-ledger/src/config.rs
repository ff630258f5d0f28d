use std::time::Duration;

use points_lock::CleanupPolicy;
use serde::{Deserialize, Serialize};

/// Configuration for the [`Ledger`](crate::Ledger).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Default wait bound for a user's lock. `None` waits indefinitely.
    pub lock_timeout_ms: Option<u64>,
    /// When idle per-user locks are dropped from the registry.
    pub cleanup: CleanupPolicy,
    /// Period of the background sweep when `cleanup` is deferred.
    pub sweep_interval_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: None,
            cleanup: CleanupPolicy::Immediate,
            sweep_interval_ms: 60_000,
        }
    }
}

impl LedgerConfig {
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
