//! Service container for dependency injection.
//!
//! The ServiceContainer builds every service from the configuration,
//! performs the fatal startup steps (first credential, channel resolution)
//! and drives the monitor and the API server until shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use helix_client::{HelixApi, HelixClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{ApiServer, ApiServerConfig, AppState};
use crate::channel::ChannelRegistry;
use crate::config::AppConfig;
use crate::credentials::CredentialManager;
use crate::logging::LoggingConfig;
use crate::monitor::{
    MonitorEvent, MonitorEventBroadcaster, Reconciler, ReconcilerConfig, StatsMonitor,
    StatsMonitorConfig,
};
use crate::state::StateStore;
use crate::Result;

/// Time allowed for the monitor and server to stop after cancellation.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Service container holding all application services.
pub struct ServiceContainer {
    config: AppConfig,
    /// Channel statistics shared by the monitor and the API.
    pub store: Arc<StateStore>,
    /// App token cache.
    pub credentials: Arc<CredentialManager>,
    /// Monitor event broadcaster.
    pub monitor_event_broadcaster: MonitorEventBroadcaster,
    monitor: StatsMonitor,
    logging_config: Option<Arc<LoggingConfig>>,
    /// Cancellation token for graceful shutdown.
    cancellation_token: CancellationToken,
}

impl ServiceContainer {
    /// Build the Helix client from the configuration and initialize.
    pub async fn from_config(
        config: AppConfig,
        logging_config: Option<Arc<LoggingConfig>>,
    ) -> Result<Self> {
        let client = HelixClient::builder(config.client_id.clone(), config.client_secret.clone())
            .timeout(config.request_timeout)
            .user_agent(concat!("twitch-stats/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Self::initialize(config, Arc::new(client), logging_config).await
    }

    /// Acquire the first credential and resolve the channel list.
    ///
    /// Both steps are fatal: an error here means the process cannot start.
    pub async fn initialize(
        config: AppConfig,
        api: Arc<dyn HelixApi>,
        logging_config: Option<Arc<LoggingConfig>>,
    ) -> Result<Self> {
        let credentials = Arc::new(CredentialManager::bootstrap(Arc::clone(&api)).await?);
        let credential = credentials.current_credential().await?;

        let registry =
            ChannelRegistry::resolve(api.as_ref(), &credential.access_token, &config.channels)
                .await?;
        if registry.len() < config.channels.len() {
            warn!(
                configured = config.channels.len(),
                resolved = registry.len(),
                "Some configured channels were not found"
            );
        }

        let store = Arc::new(StateStore::new(Arc::new(registry)));
        let monitor_event_broadcaster = MonitorEventBroadcaster::new();

        let reconciler = Reconciler::new(
            api,
            Arc::clone(&credentials),
            Arc::clone(&store),
            monitor_event_broadcaster.clone(),
            ReconcilerConfig {
                quota_floor: config.quota_floor,
            },
        );
        let monitor = StatsMonitor::new(
            reconciler,
            StatsMonitorConfig {
                poll_interval: config.poll_interval,
            },
        );

        info!(
            channels = store.registry().len(),
            poll_interval_secs = config.poll_interval.as_secs(),
            quota_floor = config.quota_floor,
            "Services initialized"
        );

        Ok(Self {
            config,
            store,
            credentials,
            monitor_event_broadcaster,
            monitor,
            logging_config,
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Subscribe to online/offline transitions.
    pub fn subscribe_monitor_events(&self) -> tokio::sync::broadcast::Receiver<MonitorEvent> {
        self.monitor_event_broadcaster.subscribe()
    }

    /// Get the cancellation token for external use.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Bind the configured address, then run until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = ApiServerConfig {
            listen_addr: self.config.listen_addr,
        }
        .bind()
        .await?;
        self.run_with_listener(listener, shutdown).await
    }

    /// Run the monitor and serve on `listener` until `shutdown` resolves or
    /// the container's token is cancelled.
    pub async fn run_with_listener<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let cancel = self.cancellation_token.clone();

        if let Some(logging_config) = &self.logging_config {
            logging_config.start_retention_cleanup(cancel.child_token());
        }

        let mut state = AppState::new(Arc::clone(&self.store));
        if let Some(logging_config) = self.logging_config.clone() {
            state = state.with_logging_config(logging_config);
        }
        let server = ApiServer::new(state, cancel.clone());

        let monitor_task = self.monitor.start(cancel.clone());
        let mut server_task = tokio::spawn(async move { server.serve(listener).await });

        let mut server_result = None;
        tokio::select! {
            _ = shutdown => info!("Shutdown signal received"),
            _ = cancel.cancelled() => info!("Shutdown requested"),
            result = &mut server_task => {
                error!("API server stopped unexpectedly");
                server_result = Some(result);
            }
        }

        info!(
            "Shutting down services (timeout: {:?})",
            DEFAULT_SHUTDOWN_TIMEOUT
        );
        cancel.cancel();

        match tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, monitor_task).await {
            Ok(Ok(reconciler)) => info!(
                cursor = reconciler.cursor().current(),
                "Stats monitor stopped"
            ),
            Ok(Err(e)) => warn!(error = %e, "Stats monitor task failed"),
            Err(_) => warn!("Shutdown timeout reached waiting for the stats monitor"),
        }

        let server_result = match server_result {
            Some(result) => Some(result),
            None => tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, server_task)
                .await
                .ok(),
        };

        match server_result {
            Some(Ok(result)) => result?,
            Some(Err(e)) => warn!(error = %e, "API server task failed"),
            None => warn!("Shutdown timeout reached waiting for the API server"),
        }

        info!("Services shut down");
        Ok(())
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
