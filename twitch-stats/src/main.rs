use anyhow::Context;
use tracing::info;

use twitch_stats::config::AppConfig;
use twitch_stats::logging::{init_logging, resolve_filter};
use twitch_stats::services::{ServiceContainer, shutdown_signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let directive = resolve_filter(
        std::env::var("RUST_LOG").ok().as_deref(),
        config.log_level.as_deref(),
    );
    let (logging_config, _guard) = init_logging(&directive, config.log_dir.as_deref())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        channels = config.channels.len(),
        listen = %config.listen_addr,
        "Starting twitch-stats"
    );

    let container = ServiceContainer::from_config(config, Some(logging_config))
        .await
        .context("startup failed")?;

    container.run(shutdown_signal()).await?;

    Ok(())
}
