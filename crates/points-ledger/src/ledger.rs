use std::sync::Arc;
use std::time::Duration;

use points_lock::{KeyGuard, KeyedLockRegistry, LockError};
use points_store::{
    BalanceStore, HistoryStore, InMemoryBalanceStore, InMemoryHistoryStore, StoreConfig,
};
use points_types::{Amount, Balance, HistoryEntry, Timestamp, TransactionKind, UserId};
use tracing::{debug, info, warn};

use crate::audit::{AuditReport, HistoryAuditor};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::recorder::HistoryRecorder;

/// Per-user point ledger.
///
/// Every mutation of a user's balance runs while holding that user's lock
/// from the ledger's own [`KeyedLockRegistry`]: read, check, write balance,
/// append history, release. Mutations for one user are therefore applied in
/// lock-grant order, while different users proceed in parallel.
///
/// Reads (`balance`, `history`) take no lock. They return whatever the
/// stores last committed, which may be just before or just after a racing
/// mutation.
pub struct Ledger {
    balances: Arc<dyn BalanceStore>,
    recorder: HistoryRecorder,
    locks: KeyedLockRegistry<UserId>,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(
        balances: Arc<dyn BalanceStore>,
        history: Arc<dyn HistoryStore>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            balances,
            recorder: HistoryRecorder::new(history),
            locks: KeyedLockRegistry::new(config.cleanup),
            config,
        }
    }

    /// A ledger backed by fresh in-memory stores.
    pub fn in_memory(config: LedgerConfig, store: StoreConfig) -> Self {
        Self::new(
            Arc::new(InMemoryBalanceStore::with_config(store.clone())),
            Arc::new(InMemoryHistoryStore::with_config(store)),
            config,
        )
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Add `amount` points to `user` and return the committed balance.
    pub async fn charge(&self, user: UserId, amount: Amount) -> LedgerResult<Balance> {
        self.mutate(user, amount, TransactionKind::Charge, self.config.lock_timeout())
            .await
    }

    /// Spend `amount` points of `user` and return the committed balance.
    pub async fn use_points(&self, user: UserId, amount: Amount) -> LedgerResult<Balance> {
        self.mutate(user, amount, TransactionKind::Use, self.config.lock_timeout())
            .await
    }

    /// [`charge`](Self::charge) with an explicit bound on the lock wait.
    pub async fn charge_with_timeout(
        &self,
        user: UserId,
        amount: Amount,
        bound: Duration,
    ) -> LedgerResult<Balance> {
        self.mutate(user, amount, TransactionKind::Charge, Some(bound))
            .await
    }

    /// [`use_points`](Self::use_points) with an explicit bound on the lock wait.
    pub async fn use_with_timeout(
        &self,
        user: UserId,
        amount: Amount,
        bound: Duration,
    ) -> LedgerResult<Balance> {
        self.mutate(user, amount, TransactionKind::Use, Some(bound))
            .await
    }

    /// Most recently committed balance for `user`. Does not lock.
    pub async fn balance(&self, user: UserId) -> LedgerResult<Balance> {
        let balance = self.balances.get(user).await?;
        Ok(balance.unwrap_or_else(|| Balance::empty(user)))
    }

    /// Every history entry for `user`, oldest first. Does not lock.
    pub async fn history(&self, user: UserId) -> LedgerResult<Vec<HistoryEntry>> {
        self.recorder.entries(user).await
    }

    /// Replay `user`'s history against the committed balance.
    ///
    /// Holds the user's lock while reading so the two views are consistent.
    pub async fn audit(&self, user: UserId) -> LedgerResult<AuditReport> {
        let _guard = self.lock(user, self.config.lock_timeout()).await?;
        let balance = self.balance(user).await?;
        let entries = self.recorder.entries(user).await?;
        Ok(HistoryAuditor::audit(&balance, &entries))
    }

    /// Number of per-user locks resident in the registry.
    pub fn resident_locks(&self) -> usize {
        self.locks.len()
    }

    /// Drop idle per-user locks. Returns how many were removed.
    pub fn sweep_locks(&self) -> usize {
        self.locks.sweep()
    }

    async fn mutate(
        &self,
        user: UserId,
        amount: Amount,
        kind: TransactionKind,
        bound: Option<Duration>,
    ) -> LedgerResult<Balance> {
        if amount <= 0 {
            warn!(user_id = %user, amount, %kind, "rejected non-positive amount");
            return Err(LedgerError::InvalidAmount { amount });
        }

        let _guard = self.lock(user, bound).await?;

        let current = self.balance(user).await?;
        let next = match kind {
            TransactionKind::Charge => current.credited(amount).ok_or(LedgerError::Overflow {
                balance: current.amount,
                amount,
            })?,
            TransactionKind::Use => match current.debited(amount) {
                Some(next) => next,
                None => {
                    warn!(
                        user_id = %user,
                        balance = current.amount,
                        requested = amount,
                        "insufficient balance"
                    );
                    return Err(LedgerError::InsufficientBalance {
                        current: current.amount,
                        requested: amount,
                    });
                }
            },
        };
        debug_assert!(next >= 0, "balance for {user} would go negative");

        let stamped = Timestamp::now().not_before(current.updated_at);
        let committed = self.balances.put(user, next, stamped).await?;
        self.recorder
            .record(&committed, kind.signed(amount), kind)
            .await?;

        info!(
            user_id = %user,
            %kind,
            amount,
            before = current.amount,
            balance = committed.amount,
            "points committed"
        );
        Ok(committed)
    }

    async fn lock(
        &self,
        user: UserId,
        bound: Option<Duration>,
    ) -> LedgerResult<KeyGuard<'_, UserId>> {
        let guard = match bound {
            Some(bound) => self
                .locks
                .acquire_timeout(user, bound)
                .await
                .map_err(|e| match e {
                    LockError::Timeout { waited } => {
                        warn!(
                            user_id = %user,
                            waited_ms = waited.as_millis() as u64,
                            "user lock timed out"
                        );
                        LedgerError::LockAcquisitionTimeout { user, waited }
                    }
                })?,
            None => self.locks.acquire(user).await,
        };
        debug!(user_id = %user, "user lock acquired");
        Ok(guard)
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
