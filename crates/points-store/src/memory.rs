use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use points_types::{Amount, Balance, HistoryEntry, Timestamp, TransactionKind, UserId};
use rand::Rng;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::traits::{BalanceStore, HistoryStore};

/// Sleep for the configured latency plus a random share of the jitter.
async fn simulate_latency(config: &StoreConfig) {
    let jitter_ms = config.latency_jitter_ms;
    let extra = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..=jitter_ms)
    } else {
        0
    };
    let delay = config.latency() + Duration::from_millis(extra);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

/// In-memory, HashMap-based balance store.
///
/// Intended for tests and embedding. Each `put` replaces the user's entry
/// under a write lock, so readers never observe a torn balance.
pub struct InMemoryBalanceStore {
    balances: RwLock<HashMap<UserId, Balance>>,
    config: StoreConfig,
}

impl InMemoryBalanceStore {
    /// Create a new empty store with no simulated latency.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Number of users with a committed balance.
    pub fn len(&self) -> usize {
        self.balances.read().map(|m| m.len()).unwrap_or_default()
    }

    /// Returns `true` if no balance was ever written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all committed balances.
    pub fn total(&self) -> i128 {
        self.balances
            .read()
            .map(|m| m.values().map(|b| i128::from(b.amount)).sum())
            .unwrap_or_default()
    }
}

impl Default for InMemoryBalanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceStore for InMemoryBalanceStore {
    async fn get(&self, user: UserId) -> StoreResult<Option<Balance>> {
        simulate_latency(&self.config).await;
        let map = self.balances.read().map_err(poisoned)?;
        Ok(map.get(&user).copied())
    }

    async fn put(
        &self,
        user: UserId,
        amount: Amount,
        updated_at: Timestamp,
    ) -> StoreResult<Balance> {
        simulate_latency(&self.config).await;
        let balance = Balance::new(user, amount, updated_at);
        let mut map = self.balances.write().map_err(poisoned)?;
        map.insert(user, balance);
        Ok(balance)
    }
}

impl std::fmt::Debug for InMemoryBalanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBalanceStore")
            .field("user_count", &self.len())
            .finish()
    }
}

/// In-memory, append-only history store.
///
/// Entries are kept per user in a `Vec`; an entry's `seq` is its 1-based
/// index in that vector.
pub struct InMemoryHistoryStore {
    entries: RwLock<HashMap<UserId, Vec<HistoryEntry>>>,
    config: StoreConfig,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Total number of entries across all users.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|m| m.values().map(Vec::len).sum())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(
        &self,
        user: UserId,
        delta: Amount,
        kind: TransactionKind,
        timestamp: Timestamp,
    ) -> StoreResult<HistoryEntry> {
        simulate_latency(&self.config).await;
        let mut map = self.entries.write().map_err(poisoned)?;
        let stream = map.entry(user).or_default();
        let entry = HistoryEntry {
            seq: stream.len() as u64 + 1,
            user_id: user,
            delta,
            kind,
            timestamp,
        };
        stream.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, user: UserId) -> StoreResult<Vec<HistoryEntry>> {
        simulate_latency(&self.config).await;
        let map = self.entries.read().map_err(poisoned)?;
        Ok(map.get(&user).cloned().unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryHistoryStore")
            .field("entry_count", &self.len())
            .finish()
    }
}
