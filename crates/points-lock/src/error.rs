use std::time::Duration;

/// Errors from lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// The caller's wait bound elapsed before the lock was granted.
    #[error("lock not granted within {}ms", waited.as_millis())]
    Timeout { waited: Duration },
}

/// Result alias for lock operations.
pub type LockResult<T> = Result<T, LockError>;
