//! Per-user point ledger.
//!
//! This crate is the heart of the points service. It provides:
//! - [`Ledger`]: charge/use with per-user serialization and overdraft checks
//! - [`HistoryRecorder`]: ordered history appends after each balance commit
//! - [`HistoryAuditor`]: replay of a user's history against their balance
//! - [`LedgerConfig`]: lock wait bounds and lock cleanup policy
//!
//! # Invariants
//!
//! - A balance is never negative at any point visible to a reader.
//! - Mutations of one user are applied in lock-grant order and their history
//!   entries appear in that same order.
//! - Every error is returned after the user's lock is released.
//! - The balance write precedes the history append. If the append fails the
//!   balance stays committed and the caller gets `HistoryWriteFailed`.

pub mod audit;
pub mod config;
pub mod error;
pub mod ledger;
pub mod recorder;

pub use audit::{AuditReport, HistoryAuditor, Violation, ViolationKind};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use recorder::HistoryRecorder;
