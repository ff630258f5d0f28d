use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid transaction kind: {0}")]
    InvalidKind(String),
}
