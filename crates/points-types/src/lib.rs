//! Foundation types for the points ledger.
//!
//! This crate provides the identity, value, and temporal types shared by
//! every other crate in the workspace.
//!
//! # Key Types
//!
//! - [`UserId`]: Identifier of the entity whose balance is tracked
//! - [`Balance`]: Committed, non-negative point total for a user
//! - [`HistoryEntry`]: Immutable record of one committed mutation
//! - [`TransactionKind`]: Whether a mutation charged or used points
//! - [`Timestamp`]: Milliseconds since the UNIX epoch

pub mod balance;
pub mod error;
pub mod history;
pub mod identity;
pub mod temporal;

pub use balance::{Amount, Balance};
pub use error::TypeError;
pub use history::{HistoryEntry, TransactionKind};
pub use identity::UserId;
pub use temporal::Timestamp;
