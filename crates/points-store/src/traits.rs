use async_trait::async_trait;
use points_types::{Amount, Balance, HistoryEntry, Timestamp, TransactionKind, UserId};

use crate::error::StoreResult;

/// Point balance storage.
///
/// All implementations must satisfy these invariants:
/// - `put` for one user is atomic: a concurrent `get` observes either the
///   previous committed balance or the new one, never a partial write.
/// - `put` returns the balance exactly as committed.
/// - Implementations do not serialize callers; concurrent `put`s for one
///   user race unless the caller holds that user's lock.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Read the committed balance for `user`.
    ///
    /// Returns `Ok(None)` if the user was never written.
    async fn get(&self, user: UserId) -> StoreResult<Option<Balance>>;

    /// Overwrite the balance for `user` and return the committed value.
    async fn put(&self, user: UserId, amount: Amount, updated_at: Timestamp)
        -> StoreResult<Balance>;
}

/// Append-only mutation history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one entry for `user` and return it with its sequence number.
    async fn append(
        &self,
        user: UserId,
        delta: Amount,
        kind: TransactionKind,
        timestamp: Timestamp,
    ) -> StoreResult<HistoryEntry>;

    /// Every entry for `user`, oldest first.
    async fn list(&self, user: UserId) -> StoreResult<Vec<HistoryEntry>>;
}
