//! Process configuration, read once from the environment at startup.
//!
//! | Variable               | Default        |
//! |------------------------|----------------|
//! | `CLIENT_ID`            | required (falls back to `CLIENT_KEY`) |
//! | `CLIENT_SECRET`        | required       |
//! | `CHANNELS`             | comma-separated logins |
//! | `CHANNELS_FILE`        | JSON array of logins, `channels.json` if present |
//! | `LISTEN_ADDR`          | `0.0.0.0:2112` |
//! | `POLL_INTERVAL_SECS`   | `30`           |
//! | `QUOTA_FLOOR`          | `5`            |
//! | `REQUEST_TIMEOUT_SECS` | `10`           |
//! | `LOG_LEVEL`            | unset          |
//! | `LOG_DIR`              | unset (console only) |

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::channel::normalize_logins;
use crate::monitor::{DEFAULT_POLL_INTERVAL, DEFAULT_QUOTA_FLOOR};
use crate::{Error, Result};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:2112";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Read when neither `CHANNELS` nor `CHANNELS_FILE` is set.
pub const DEFAULT_CHANNELS_FILE: &str = "channels.json";

/// Validated application configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Normalized logins, in operator order.
    pub channels: Vec<String>,
    pub listen_addr: SocketAddr,
    pub poll_interval: Duration,
    pub quota_floor: u32,
    pub request_timeout: Duration,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("channels", &self.channels)
            .field("listen_addr", &self.listen_addr)
            .field("poll_interval", &self.poll_interval)
            .field("quota_floor", &self.quota_floor)
            .field("request_timeout", &self.request_timeout)
            .field("log_level", &self.log_level)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let client_id = var("CLIENT_ID")
            .or_else(|| var("CLIENT_KEY"))
            .ok_or_else(|| Error::config("CLIENT_ID is required"))?;
        let client_secret =
            var("CLIENT_SECRET").ok_or_else(|| Error::config("CLIENT_SECRET is required"))?;

        let channels = match (var("CHANNELS"), var("CHANNELS_FILE")) {
            (Some(list), _) => normalize_logins(list.split(',')),
            (None, Some(path)) => read_channels_file(Path::new(&path))?,
            (None, None) => {
                let default = Path::new(DEFAULT_CHANNELS_FILE);
                if !default.is_file() {
                    return Err(Error::config(
                        "no channels configured, set CHANNELS or CHANNELS_FILE",
                    ));
                }
                read_channels_file(default)?
            }
        };
        if channels.is_empty() {
            return Err(Error::config("channel list is empty"));
        }

        let listen_addr = parse_or("LISTEN_ADDR", var("LISTEN_ADDR"), || {
            SocketAddr::from_str(DEFAULT_LISTEN_ADDR).map_err(|e| Error::config(e.to_string()))
        })?;

        let poll_interval = match var("POLL_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(positive_secs("POLL_INTERVAL_SECS", &raw)?),
            None => DEFAULT_POLL_INTERVAL,
        };
        let request_timeout = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(positive_secs("REQUEST_TIMEOUT_SECS", &raw)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };
        let quota_floor = parse_or("QUOTA_FLOOR", var("QUOTA_FLOOR"), || {
            Ok(DEFAULT_QUOTA_FLOOR)
        })?;

        Ok(Self {
            client_id,
            client_secret,
            channels,
            listen_addr,
            poll_interval,
            quota_floor,
            request_timeout,
            log_level: var("LOG_LEVEL"),
            log_dir: var("LOG_DIR").map(PathBuf::from),
        })
    }
}

fn parse_or<T, D>(key: &str, raw: Option<String>, default: D) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    D: FnOnce() -> Result<T>,
{
    match raw {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::config(format!("invalid {key} '{raw}': {e}"))),
        None => default(),
    }
}

fn positive_secs(key: &str, raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(0) => Err(Error::config(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(secs),
        Err(e) => Err(Error::config(format!("invalid {key} '{raw}': {e}"))),
    }
}

/// Read a JSON array of logins.
fn read_channels_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("cannot read channels file {}: {}", path.display(), e))
    })?;
    let raw: Vec<String> = serde_json::from_str(&content).map_err(|e| {
        Error::config(format!(
            "channels file {} is not a JSON array of strings: {}",
            path.display(),
            e
        ))
    })?;
    Ok(normalize_logins(raw))
}
