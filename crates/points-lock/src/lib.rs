//! Per-key mutual exclusion for the points ledger.
//!
//! [`KeyedLockRegistry`] hands out one fair async mutex per key, created on
//! first use and dropped again once nothing references it. Operations on the
//! same key are serialized in request order; operations on different keys
//! never contend beyond a short critical section on the registry table.
//!
//! # Design Rules
//!
//! 1. Every structural change to the table (insert, remove) happens under a
//!    single coordination mutex that is never held across an `.await`.
//! 2. A key's reference count covers holders and waiters alike. It is
//!    incremented before waiting and decremented when the guard drops or the
//!    pending acquisition is cancelled.
//! 3. An entry is removed only when its count is zero and its mutex is free.
//! 4. Release happens in `Drop`, so every exit path releases.

pub mod error;
pub mod registry;

pub use error::{LockError, LockResult};
pub use registry::{CleanupPolicy, KeyGuard, KeyedLockRegistry};
