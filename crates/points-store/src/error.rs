/// Errors from balance and history store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backend could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A panic left the in-memory table lock poisoned.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
