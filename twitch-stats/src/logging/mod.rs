//! Logging setup with a reloadable filter.
//!
//! This module provides:
//! - Runtime log level changes via `tracing_subscriber::reload`
//! - Optional daily-rotated log files with 7-day retention cleanup
//! - Local timezone timestamps for logs

use chrono::{Local, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::Writer, time::FormatTime},
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
};

use crate::{Error, Result};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "twitch_stats=info,helix_client=info";

/// Prefix of rotated log files, followed by `.YYYY-MM-DD`.
const LOG_FILE_NAME: &str = "twitch-stats.log";

/// Log retention period in days.
const LOG_RETENTION_DAYS: i64 = 7;

/// Crates whose level a bare `LOG_LEVEL` applies to.
const APP_TARGETS: &[&str] = &["twitch_stats", "helix_client"];

/// Custom timer that uses the local timezone via chrono.
#[derive(Debug, Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// Type alias for the reload handle.
pub type FilterHandle = Handle<EnvFilter, tracing_subscriber::Registry>;

/// Handle to the installed subscriber's filter.
pub struct LoggingConfig {
    handle: FilterHandle,
    log_dir: Option<PathBuf>,
}

impl LoggingConfig {
    fn new(handle: FilterHandle, log_dir: Option<PathBuf>) -> Self {
        Self { handle, log_dir }
    }

    /// Get the current filter directive string.
    pub fn get_filter(&self) -> String {
        self.handle
            .with_current(|filter| filter.to_string())
            .unwrap_or_default()
    }

    /// Replace the filter directive, e.g. `twitch_stats=debug,helix_client=info`.
    pub fn set_filter(&self, directive: &str) -> Result<()> {
        let new_filter = EnvFilter::try_new(directive)
            .map_err(|e| Error::config(format!("Invalid filter directive: {}", e)))?;

        self.handle
            .reload(new_filter)
            .map_err(|e| Error::Other(format!("Failed to reload filter: {}", e)))?;

        info!(directive = %directive, "Log filter updated");
        Ok(())
    }

    /// Directory of the rotated log files, if file logging is enabled.
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Start the log retention cleanup task.
    ///
    /// Runs once at startup and then daily; deletes log files older than 7 days.
    /// Does nothing when file logging is disabled.
    pub fn start_retention_cleanup(self: &Arc<Self>, cancel_token: CancellationToken) {
        let Some(log_dir) = self.log_dir.clone() else {
            return;
        };

        tokio::spawn(async move {
            let cleanup_interval = Duration::from_secs(24 * 60 * 60);

            loop {
                if let Err(e) = cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS).await {
                    warn!(error = %e, "Failed to cleanup old logs");
                }

                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        debug!("Log retention cleanup task shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(cleanup_interval) => {}
                }
            }
        });
    }

    /// Build a config around a reload layer that is not installed globally.
    #[cfg(test)]
    pub(crate) fn detached(
        directive: &str,
    ) -> (
        Arc<Self>,
        reload::Layer<EnvFilter, tracing_subscriber::Registry>,
    ) {
        let (layer, handle) = reload::Layer::new(EnvFilter::new(directive));
        (Arc::new(Self::new(handle, None)), layer)
    }
}

/// Pick the initial filter directive.
///
/// `RUST_LOG` wins verbatim. A `LOG_LEVEL` that is a bare level such as
/// `debug` is applied to the application crates; anything else is used as a
/// directive.
pub fn resolve_filter(rust_log: Option<&str>, log_level: Option<&str>) -> String {
    if let Some(directive) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        return directive.to_string();
    }

    match log_level.map(str::trim).filter(|s| !s.is_empty()) {
        Some(level) if is_bare_level(level) => APP_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level.to_lowercase()))
            .collect::<Vec<_>>()
            .join(","),
        Some(directive) => directive.to_string(),
        None => DEFAULT_LOG_FILTER.to_string(),
    }
}

fn is_bare_level(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error" | "off"
    )
}

/// Delete log files older than the specified number of days.
async fn cleanup_old_logs(log_dir: &Path, retention_days: i64) -> std::io::Result<usize> {
    let cutoff = Utc::now().date_naive() - chrono::Duration::days(retention_days);
    let prefix = format!("{}.", LOG_FILE_NAME);

    let mut entries = tokio::fs::read_dir(log_dir).await?;
    let mut deleted_count = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(date_str) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| name.strip_prefix(&prefix))
        else {
            continue;
        };

        let Ok(file_date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };

        if file_date < cutoff {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    deleted_count += 1;
                    debug!(path = %path.display(), "Deleted old log file");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete old log file")
                }
            }
        }
    }

    if deleted_count > 0 {
        info!(count = deleted_count, "Cleaned up old log files");
    }

    Ok(deleted_count)
}

/// Install the global subscriber.
///
/// Console output always; a daily-rotated file when `log_dir` is set. Keep
/// the returned guard alive for the lifetime of the process so buffered file
/// output is flushed.
pub fn init_logging(
    directive: &str,
    log_dir: Option<&Path>,
) -> Result<(Arc<LoggingConfig>, Option<WorkerGuard>)> {
    let initial_filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{directive}' ({e}), using {DEFAULT_LOG_FILTER}");
        EnvFilter::new(DEFAULT_LOG_FILTER)
    });
    let (filter_layer, filter_handle) = reload::Layer::new(initial_filter);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_timer(LocalTimer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_ansi(true).with_timer(LocalTimer))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))?;

    let config = Arc::new(LoggingConfig::new(
        filter_handle,
        log_dir.map(Path::to_path_buf),
    ));

    Ok((config, guard))
}

/// Available logging modules for API responses.
pub fn available_modules() -> Vec<(&'static str, &'static str)> {
    vec![
        ("twitch_stats", "Main application"),
        ("twitch_stats::monitor", "Poll cycle and quota budget"),
        ("twitch_stats::credentials", "App token renewal"),
        ("helix_client", "Helix API client"),
        ("reqwest", "HTTP requests"),
        ("tower_http", "HTTP middleware"),
    ]
}
