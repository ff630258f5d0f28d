use std::sync::Arc;

use points_store::HistoryStore;
use points_types::{Amount, Balance, HistoryEntry, TransactionKind, UserId};
use tracing::warn;

use crate::error::{LedgerError, LedgerResult};

/// Appends history entries for committed balance writes.
///
/// The recorder is only called by the holder of the user's lock and only
/// after the balance write it describes has been confirmed, so a user's
/// entries land in lock-grant order.
#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn HistoryStore>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Record the mutation that produced `committed`.
    ///
    /// The entry carries the committed balance's timestamp. A store failure
    /// becomes [`LedgerError::HistoryWriteFailed`], since the balance has
    /// already changed by the time this runs.
    pub async fn record(
        &self,
        committed: &Balance,
        delta: Amount,
        kind: TransactionKind,
    ) -> LedgerResult<HistoryEntry> {
        self.store
            .append(committed.user_id, delta, kind, committed.updated_at)
            .await
            .map_err(|source| {
                warn!(
                    user_id = %committed.user_id,
                    balance = committed.amount,
                    delta,
                    error = %source,
                    "history append failed after balance commit"
                );
                LedgerError::HistoryWriteFailed {
                    balance: committed.amount,
                    source,
                }
            })
    }

    /// Every recorded entry for `user`, oldest first.
    pub async fn entries(&self, user: UserId) -> LedgerResult<Vec<HistoryEntry>> {
        Ok(self.store.list(user).await?)
    }
}

impl std::fmt::Debug for HistoryRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryRecorder").finish_non_exhaustive()
    }
}
