use std::time::Duration;

use points_store::StoreError;
use points_types::{Amount, UserId};

/// Errors produced by ledger operations.
///
/// Every variant is returned after the user's lock has been released.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The requested amount was zero or negative. Rejected before locking.
    #[error("amount must be positive, got {amount}")]
    InvalidAmount { amount: Amount },

    /// The balance at check time cannot cover the requested use.
    #[error("insufficient balance: current {current}, requested {requested}")]
    InsufficientBalance { current: Amount, requested: Amount },

    /// The resulting balance would not fit in an `i64`.
    #[error("balance overflow: {balance} + {amount}")]
    Overflow { balance: Amount, amount: Amount },

    /// A store collaborator failed; nothing was committed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The balance was committed but its history entry could not be written.
    ///
    /// `balance` is authoritative: later reads return it even though the
    /// history is missing this mutation.
    #[error("balance committed at {balance} but history append failed: {source}")]
    HistoryWriteFailed { balance: Amount, source: StoreError },

    /// The user's lock was not granted within the caller's bound.
    #[error("lock for user {user} not acquired within {}ms", waited.as_millis())]
    LockAcquisitionTimeout { user: UserId, waited: Duration },
}

impl LedgerError {
    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::Overflow { .. } => "OVERFLOW",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::HistoryWriteFailed { .. } => "HISTORY_WRITE_FAILED",
            Self::LockAcquisitionTimeout { .. } => "LOCK_TIMEOUT",
        }
    }

    /// Returns `true` if the balance changed despite the error.
    pub fn balance_committed(&self) -> bool {
        matches!(self, Self::HistoryWriteFailed { .. })
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
