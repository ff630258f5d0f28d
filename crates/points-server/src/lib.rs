//! HTTP server for the points ledger.
//!
//! Exposes balance lookup, history listing, charge, and use over a small
//! JSON API. Every mutation goes through [`points_ledger::Ledger`], so the
//! per-user ordering guarantees hold regardless of how many requests race.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{PointsConfig, ServerConfig};
pub use error::{ErrorBody, ServerError, ServerResult};
pub use server::{spawn_sweeper, PointsServer};
