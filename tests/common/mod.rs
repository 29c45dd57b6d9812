//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;

use raw_proxy::config::ProxyConfig;
use raw_proxy::credentials::CredentialResolver;
use raw_proxy::http::{AppState, HttpServer};
use raw_proxy::lifecycle::Shutdown;
use raw_proxy::upstream::ReqwestFetcher;

/// Token the mock upstream accepts for `/private/...` paths.
pub const GOOD_TOKEN: &str = "ghp_good";

/// PNG-ish bytes served for public files.
pub const PUBLIC_BODY: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];

/// One request as seen by a mock server.
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
}

#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Recorder {
    fn record(&self, uri: &Uri, headers: &HeaderMap) -> Option<String> {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.seen.lock().unwrap().push(Seen {
            path: uri.path().to_string(),
            query: uri.query().map(String::from),
            authorization: authorization.clone(),
        });
        authorization
    }

    pub fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

async fn raw_file(State(recorder): State<Recorder>, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    let authorization = recorder.record(&uri, &headers);
    let path = uri.path();

    if path.starts_with("/private/") {
        let expected = format!("token {}", GOOD_TOKEN);
        return if authorization.as_deref() == Some(expected.as_str()) {
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], b"secret".to_vec()).into_response()
        } else {
            (StatusCode::UNAUTHORIZED, "401: Unauthorized").into_response()
        };
    }
    if path.starts_with("/missing/") {
        return (StatusCode::NOT_FOUND, "404: Not Found").into_response();
    }
    if path.starts_with("/flaky/") {
        return (StatusCode::SERVICE_UNAVAILABLE, "try later").into_response();
    }

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "max-age=300"),
            (header::ETAG, "\"v1\""),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "https://github.com"),
        ],
        PUBLIC_BODY.to_vec(),
    )
        .into_response()
}

/// Start a mock raw-content host on an ephemeral port.
pub async fn start_mock_upstream() -> (SocketAddr, Recorder) {
    let recorder = Recorder::default();
    let router = Router::new()
        .route("/{*path}", get(raw_file))
        .with_state(recorder.clone());
    (serve(router).await, recorder)
}

#[derive(Clone)]
struct KvState {
    recorder: Recorder,
    values: Arc<HashMap<String, String>>,
}

async fn kv_value(
    State(state): State<KvState>,
    Path(key): Path<String>,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.recorder.record(&uri, &headers);
    match state.values.get(&key) {
        Some(value) => (StatusCode::OK, value.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "key not found").into_response(),
    }
}

/// Start a mock KV REST namespace at `http://{addr}/kv`.
pub async fn start_mock_kv(values: &[(&str, &str)]) -> (SocketAddr, Recorder) {
    let recorder = Recorder::default();
    let state = KvState {
        recorder: recorder.clone(),
        values: Arc::new(
            values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ),
    };
    let router = Router::new()
        .route("/kv/values/{key}", get(kv_value))
        .with_state(state);
    (serve(router).await, recorder)
}

/// Config pointing the proxy at a plain-HTTP mock upstream.
pub fn config_for(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.scheme = "http".into();
    config.upstream.host = upstream.to_string();
    config
}

/// A client that never goes through a system proxy.
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Start the proxy with an explicit resolver; returns its address and the
/// shutdown handle.
pub async fn start_proxy(config: ProxyConfig, resolver: CredentialResolver) -> (SocketAddr, Shutdown) {
    let fetcher = Arc::new(ReqwestFetcher::with_client(direct_client()));
    let state = AppState::new(&config, resolver, fetcher).unwrap();
    let server = HttpServer::with_state(&config, state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}
