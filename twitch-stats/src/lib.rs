//! twitch-stats library crate.
//!
//! Polls channel statistics from the Twitch Helix API on a fixed interval,
//! spends the per-cycle request quota fairly across follower lookups, and
//! exposes the result as Prometheus metrics and a JSON document.
//!
//! This module exposes the core functionality for integration testing.

pub mod api;
pub mod channel;
pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
