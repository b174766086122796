//! Full stack against a local Helix stand-in: real HTTP client, monitor and
//! API server.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use helix_client::HelixClient;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use twitch_stats::config::AppConfig;
use twitch_stats::monitor::MonitorEvent;
use twitch_stats::services::ServiceContainer;

type Params = Query<Vec<(String, String)>>;

#[derive(Default)]
struct Platform {
    live: Mutex<HashMap<String, u64>>,
    followers: Mutex<HashMap<String, u64>>,
}

const KNOWN: &[&str] = &["alpha", "beta", "gamma"];

fn values(params: &[(String, String)], key: &str) -> Vec<String> {
    params
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .collect()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer e2e-token")
}

async fn token() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "access_token": "e2e-token",
        "expires_in": 5000,
        "token_type": "bearer",
    }))
}

async fn users(headers: HeaderMap, Query(params): Params) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let data: Vec<serde_json::Value> = values(&params, "login")
        .into_iter()
        .filter(|login| KNOWN.contains(&login.as_str()))
        .map(|login| {
            serde_json::json!({
                "id": format!("{login}-id"),
                "login": login,
                "display_name": login.to_uppercase(),
                "view_count": 5000,
            })
        })
        .collect();
    Json(serde_json::json!({ "data": data })).into_response()
}

async fn streams(
    State(platform): State<Arc<Platform>>,
    headers: HeaderMap,
    Query(params): Params,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let live = platform.live.lock().clone();
    let data: Vec<serde_json::Value> = values(&params, "user_login")
        .into_iter()
        .filter_map(|login| {
            live.get(&login).map(|viewers| {
                serde_json::json!({
                    "id": format!("stream-{login}"),
                    "user_id": format!("{login}-id"),
                    "user_login": login,
                    "user_name": login.to_uppercase(),
                    "title": "e2e",
                    "viewer_count": viewers,
                    "started_at": "2024-01-01T18:00:00Z",
                })
            })
        })
        .collect();
    (
        [("ratelimit-remaining", "800")],
        Json(serde_json::json!({ "data": data })),
    )
        .into_response()
}

async fn follows(State(platform): State<Arc<Platform>>, Query(params): Params) -> impl IntoResponse {
    let id = values(&params, "to_id").into_iter().next().unwrap_or_default();
    let total = platform.followers.lock().get(&id).copied().unwrap_or(0);
    Json(serde_json::json!({ "total": total, "data": [] }))
}

async fn spawn_platform(platform: Arc<Platform>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new()
        .route("/oauth2/token", post(token))
        .route("/helix/users", get(users))
        .route("/helix/streams", get(streams))
        .route("/helix/users/follows", get(follows))
        .with_state(platform);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn config(listen_addr: SocketAddr) -> AppConfig {
    AppConfig {
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
        channels: vec!["alpha".into(), "beta".into(), "gamma".into(), "ghost".into()],
        listen_addr,
        poll_interval: Duration::from_secs(3600),
        quota_floor: 5,
        request_timeout: Duration::from_secs(5),
        log_level: None,
        log_dir: None,
    }
}

async fn http_get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

async fn start(platform: Arc<Platform>) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let base = spawn_platform(platform).await;
    let client = HelixClient::builder("cid", "secret")
        .api_base(format!("{base}/helix"))
        .auth_base(base)
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let container = ServiceContainer::initialize(config(addr), Arc::new(client), None)
        .await
        .unwrap();
    assert_eq!(container.store.registry().len(), 3);

    let mut events = container.subscribe_monitor_events();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(container.run_with_listener(listener, async move {
        let _ = rx.await;
    }));

    let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .unwrap()
        .unwrap();
    if let MonitorEvent::ChannelLive { display_name, .. } = &event {
        assert_eq!(display_name, "ALPHA");
    }

    (addr, tx)
}

#[tokio::test]
async fn serves_reconciled_stats() {
    let platform = Arc::new(Platform::default());
    platform.live.lock().insert("alpha".to_string(), 42);
    platform.followers.lock().insert("beta-id".to_string(), 77);

    let (addr, shutdown) = start(Arc::clone(&platform)).await;

    let ready = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if http_get(addr, "/health/ready").await.0 == 200 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(ready.is_ok());

    let (status, body) = http_get(addr, "/").await;
    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let channels = json.as_array().unwrap();
    assert_eq!(channels.len(), 3);
    assert_eq!(channels[0]["name"], "ALPHA");
    assert_eq!(channels[0]["online"], true);
    assert_eq!(channels[0]["viewers"], 42);
    assert_eq!(channels[0]["views"], 5000);
    assert_eq!(channels[0]["uptime"], 1_704_132_000);
    assert_eq!(channels[1]["name"], "BETA");
    assert_eq!(channels[1]["online"], false);
    assert_eq!(channels[1]["viewers"], 0);
    assert_eq!(channels[1]["uptime"], 0);
    assert_eq!(channels[1]["followers"], 77);
    assert_eq!(channels[2]["name"], "GAMMA");
    assert_eq!(channels[2]["online"], false);
    assert_eq!(channels[2]["viewers"], 0);
    assert_eq!(channels[2]["uptime"], 0);
    assert_eq!(channels[2]["views"], 5000);
    assert_eq!(channels[2]["followers"], 0);

    let (status, metrics) = http_get(addr, "/metrics").await;
    assert_eq!(status, 200);
    assert!(metrics.contains("twitch_online{name=\"ALPHA\"} 1"));
    assert!(metrics.contains("twitch_viewers{name=\"ALPHA\"} 42"));
    assert!(metrics.contains("twitch_online{name=\"GAMMA\"} 0"));
    assert!(metrics.contains("twitch_viewers{name=\"GAMMA\"} 0"));
    assert!(metrics.contains("twitch_token_remaining 800"));
    assert!(!metrics.contains("ghost"));

    shutdown.send(()).unwrap();
}

#[tokio::test]
async fn token_endpoint_failure_fails_startup() {
    let base = spawn_platform(Arc::new(Platform::default())).await;
    let client = HelixClient::builder("cid", "secret")
        .api_base(format!("{base}/missing"))
        .auth_base(format!("{base}/missing"))
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let result = ServiceContainer::initialize(
        config(SocketAddr::from(([127, 0, 0, 1], 0))),
        Arc::new(client),
        None,
    )
    .await;

    assert!(matches!(result, Err(twitch_stats::Error::Credential(_))));
}
