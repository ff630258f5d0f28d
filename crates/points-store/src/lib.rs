//! Storage boundaries for the points ledger.
//!
//! The ledger core never owns durable state. It reads and writes balances
//! through [`BalanceStore`] and appends mutation records through
//! [`HistoryStore`]; both are async, thread-safe traits.
//!
//! # Storage Backends
//!
//! - [`InMemoryBalanceStore`] -- `HashMap`-based balances for tests and embedding
//! - [`InMemoryHistoryStore`] -- per-user append-only vectors
//!
//! # Design Rules
//!
//! 1. A single-key `put` is atomic: readers see the old or the new balance.
//! 2. History is append-only; entries are never rewritten.
//! 3. `list` returns entries in append order, oldest first.
//! 4. Stores never serialize callers per key; that is the ledger's job.
//! 5. All backend failures are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod memory;
pub mod traits;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryBalanceStore, InMemoryHistoryStore};
pub use traits::{BalanceStore, HistoryStore};
