//! API server setup and configuration.

use axum::Router;
use axum::extract::Request;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use crate::metrics::PrometheusExporter;
use crate::state::StateStore;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub listen_addr: SocketAddr,
}

impl ApiServerConfig {
    /// Bind the listen address.
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| Error::config(format!("cannot bind {}: {}", self.listen_addr, e)))
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Channel statistics, written by the reconciler
    pub store: Arc<StateStore>,
    /// Prometheus renderer over `store`
    pub exporter: Arc<PrometheusExporter>,
    /// Logging configuration for dynamic log level changes
    pub logging_config: Option<Arc<LoggingConfig>>,
}

impl AppState {
    pub fn new(store: Arc<StateStore>) -> Self {
        let exporter = Arc::new(PrometheusExporter::new(Arc::clone(&store)));
        Self {
            start_time: Instant::now(),
            store,
            exporter,
            logging_config: None,
        }
    }

    pub fn with_logging_config(mut self, logging_config: Arc<LoggingConfig>) -> Self {
        self.logging_config = Some(logging_config);
        self
    }
}

/// Scraped on a short interval; kept out of the request log.
fn is_quiet_path(path: &str) -> bool {
    path.starts_with("/health") || path == "/metrics"
}

/// API server.
pub struct ApiServer {
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    pub fn new(state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            state,
            cancel_token,
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if is_quiet_path(req.uri().path()) {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_request(|req: &Request, span: &Span| {
                    if span.is_disabled() || is_quiet_path(req.uri().path()) {
                        return;
                    }
                    let mut on_request =
                        tower_http::trace::DefaultOnRequest::new().level(tracing::Level::DEBUG);
                    use tower_http::trace::OnRequest;
                    on_request.on_request(req, span);
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                )
                .on_failure(
                    |class: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let mut on_failure =
                            tower_http::trace::DefaultOnFailure::new().level(tracing::Level::ERROR);
                        use tower_http::trace::OnFailure;
                        on_failure.on_failure(class, latency, span);
                    },
                ),
        )
    }

    /// Serve on an already bound listener until cancelled.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!("API server listening on http://{}", addr);

        let router = self.build_router();
        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await
            .map_err(|e| Error::Other(format!("Server error: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::channel::{ChannelRecord, ChannelRegistry};

    fn state() -> AppState {
        let registry = ChannelRegistry::new([ChannelRecord {
            id: "1".to_string(),
            login: "alpha".to_string(),
            display_name: "Alpha".to_string(),
        }]);
        AppState::new(Arc::new(StateStore::new(Arc::new(registry))))
    }

    #[tokio::test]
    async fn test_bind_reports_address_in_use() {
        let first = ApiServerConfig {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
        .bind()
        .await
        .unwrap();
        let taken = first.local_addr().unwrap();

        let err = ApiServerConfig { listen_addr: taken }
            .bind()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains(&taken.to_string()));
    }

    #[test]
    fn test_app_state_creation() {
        let state = state();
        assert!(state.start_time.elapsed().as_secs() < 1);
        assert!(state.logging_config.is_none());
    }

    #[test]
    fn test_quiet_paths() {
        assert!(is_quiet_path("/metrics"));
        assert!(is_quiet_path("/health/ready"));
        assert!(!is_quiet_path("/"));
    }

    #[tokio::test]
    async fn test_serves_until_cancelled() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = ApiServer::new(state(), CancellationToken::new());
        let cancel = server.cancel_token();
        let handle = tokio::spawn(async move { server.serve(listener).await });

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("twitch_online{name=\"Alpha\"} 0"));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
