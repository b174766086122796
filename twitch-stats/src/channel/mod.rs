//! Tracked channels, resolved once at startup.

mod registry;

pub use registry::{ChannelRecord, ChannelRegistry, normalize_logins};
