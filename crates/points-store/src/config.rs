use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the in-memory store backends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Fixed delay applied to every store call, in milliseconds.
    pub simulated_latency_ms: u64,
    /// Upper bound of an additional random delay per call, in milliseconds.
    pub latency_jitter_ms: u64,
}

impl StoreConfig {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            simulated_latency_ms: latency.as_millis() as u64,
            latency_jitter_ms: 0,
        }
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.latency_jitter_ms)
    }
}
