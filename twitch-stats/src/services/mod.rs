//! Service wiring and lifecycle.

mod container;

pub use container::{DEFAULT_SHUTDOWN_TIMEOUT, ServiceContainer, shutdown_signal};
