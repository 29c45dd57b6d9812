//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum Router and wire middleware (request ID, tracing)
//! - Serve the info page at `/`
//! - Run the proxy pipeline for every other path:
//!   forward path → credential → upstream fetch → translated response
//! - Graceful shutdown on the lifecycle broadcast

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header::InvalidHeaderValue, request::Parts, Method, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ProxyConfig, UpstreamConfig};
use crate::credentials::{build_store, CredentialResolver, StoreError, TOKEN_QUERY_PARAM};
use crate::http::error::ProxyError;
use crate::http::info::info_page;
use crate::http::request::{loggable_uri, request_id, ForwardPath, MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::translate;
use crate::observability::metrics;
use crate::security::ResponseHeaderPolicy;
use crate::upstream::{Fetch, FetchError, ReqwestFetcher, UpstreamRequest};

/// Failure to assemble the handler state at startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("token store: {0}")]
    Store(#[from] StoreError),

    #[error("upstream client: {0}")]
    Client(#[from] FetchError),

    #[error("response headers: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Application state injected into handlers. Immutable once built.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<CredentialResolver>,
    pub fetcher: Arc<dyn Fetch>,
    pub upstream: Arc<UpstreamConfig>,
    pub policy: Arc<ResponseHeaderPolicy>,
}

impl AppState {
    /// Build the production state: reqwest fetcher plus the configured store.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ServerError> {
        let fetcher = ReqwestFetcher::new(&config.upstream)?;
        let store = build_store(&config.credentials.store, fetcher.client())?;
        let resolver = CredentialResolver::new(
            store,
            config.credentials.namespace.clone(),
            config.credentials.fallback_token.clone(),
        );
        Self::new(config, resolver, Arc::new(fetcher))
    }

    /// Build state around an explicit resolver and fetcher.
    pub fn new(
        config: &ProxyConfig,
        resolver: CredentialResolver,
        fetcher: Arc<dyn Fetch>,
    ) -> Result<Self, ServerError> {
        Ok(Self {
            resolver: Arc::new(resolver),
            fetcher,
            upstream: Arc::new(config.upstream.clone()),
            policy: Arc::new(ResponseHeaderPolicy::new(&config.cache, &config.cors)?),
        })
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server with production collaborators.
    pub fn new(config: &ProxyConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(config)?;
        Ok(Self::with_state(config, state))
    }

    /// Create a server around a prepared state.
    pub fn with_state(config: &ProxyConfig, state: AppState) -> Self {
        tracing::info!(
            upstream = %format!("{}://{}", config.upstream.scheme, config.upstream.host),
            namespace = %config.credentials.namespace,
            store = state.resolver.has_store(),
            fallback_token = state.resolver.has_fallback(),
            "Proxy state initialised"
        );
        Self {
            router: build_router(state),
        }
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(proxy_handler))
        .route("/{*path}", any(proxy_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %loggable_uri(request.uri(), TOKEN_QUERY_PARAM),
                        request_id = %request_id(request),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
        )
}

fn is_allowed(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD || *method == Method::OPTIONS
}

/// Entry point for every request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, _body) = request.into_parts();

    if !is_allowed(&parts.method) {
        tracing::warn!(method = %parts.method, "Rejected method");
        let response = ProxyError::MethodNotAllowed(parts.method).into_response();
        metrics::record_request(response.status().as_u16(), "none", start);
        return response;
    }

    let Some(path) = ForwardPath::parse(parts.uri.path()) else {
        let response = info_page(&parts.headers, &state.policy);
        metrics::record_request(response.status().as_u16(), "none", start);
        return response;
    };

    let (source, result) = forward(&state, &parts, &path).await;
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            match &err {
                ProxyError::Transport(description) => {
                    tracing::error!(path = %path, error = %description, "Proxy request failed");
                }
                other => {
                    tracing::info!(path = %path, status = %other.status(), "Upstream refused request");
                }
            }
            err.into_response()
        }
    };

    metrics::record_request(response.status().as_u16(), source, start);
    response
}

/// Resolve, fetch and translate. Returns the credential source label
/// alongside the outcome.
async fn forward(
    state: &AppState,
    parts: &Parts,
    path: &ForwardPath,
) -> (&'static str, Result<Response, ProxyError>) {
    let resolved = state
        .resolver
        .resolve(&parts.headers, parts.uri.query(), path)
        .await;

    let (credential, source) = match resolved {
        Some((credential, source)) => {
            tracing::debug!(path = %path, source = %source, "Credential resolved");
            (Some(credential), source.label())
        }
        None => {
            tracing::debug!(path = %path, "No credential; fetching anonymously");
            (None, "none")
        }
    };

    let upstream_request = UpstreamRequest::new(&state.upstream, path, credential);
    let preflight = parts.method == Method::OPTIONS;
    let result = match state.fetcher.fetch(upstream_request).await {
        Ok(upstream) => translate(upstream, &state.policy, preflight),
        Err(err) => Err(ProxyError::from(err)),
    };
    (source, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{MemoryStore, TokenStore, TOKEN_HEADER};
    use crate::upstream::UpstreamResponse;
    use axum::body::{to_bytes, Bytes};
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Returns a canned response and records what it was asked to fetch.
    struct MockFetcher {
        outcome: Result<(StatusCode, HeaderMap, &'static [u8]), &'static str>,
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    impl MockFetcher {
        fn replying(status: StatusCode, body: &'static [u8]) -> Arc<Self> {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/markdown"));
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=300"));
            Arc::new(Self {
                outcome: Ok((status, headers, body)),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(message),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Fetch for MockFetcher {
        fn fetch(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, FetchError>> {
            let authorization = request
                .headers()
                .ok()
                .and_then(|h| h.get(header::AUTHORIZATION).cloned())
                .and_then(|v| v.to_str().ok().map(String::from));
            self.seen.lock().unwrap().push((request.url.clone(), authorization));

            let result = match &self.outcome {
                Ok((status, headers, body)) => Ok(UpstreamResponse {
                    status: *status,
                    headers: headers.clone(),
                    body: Bytes::from_static(*body),
                }),
                Err(message) => Err(FetchError::InvalidUrl(message.to_string())),
            };
            futures_util::future::ready(result).boxed()
        }
    }

    fn router(fetcher: Arc<MockFetcher>, resolver: CredentialResolver) -> Router {
        let config = ProxyConfig::default();
        let state = AppState::new(&config, resolver, fetcher).unwrap();
        HttpServer::with_state(&config, state).router()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn anonymous_fetch_relays_body() {
        let fetcher = MockFetcher::replying(StatusCode::OK, b"# Hello World");
        let app = router(fetcher.clone(), CredentialResolver::default());

        let (status, headers, body) = send(app, get("/octocat/Hello-World/main/README.md")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"# Hello World");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=86400");
        assert_eq!(headers[header::CONTENT_TYPE], "text/markdown");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.contains_key(X_REQUEST_ID));
        assert_eq!(
            fetcher.calls(),
            vec![(
                "https://raw.githubusercontent.com/octocat/Hello-World/main/README.md".to_string(),
                None
            )]
        );
    }

    #[tokio::test]
    async fn query_token_is_used_but_not_forwarded() {
        let fetcher = MockFetcher::replying(StatusCode::OK, b"data");
        let app = router(fetcher.clone(), CredentialResolver::default());

        let (status, headers, body) =
            send(app, get("/o/private/main/img.png?token=ghp_query&v=2")).await;

        assert_eq!(status, StatusCode::OK);
        let (url, authorization) = fetcher.calls().remove(0);
        assert_eq!(url, "https://raw.githubusercontent.com/o/private/main/img.png");
        assert_eq!(authorization.as_deref(), Some("token ghp_query"));

        for value in headers.values() {
            assert!(!value.as_bytes().windows(9).any(|w| w == b"ghp_query"));
        }
        assert!(!body.windows(9).any(|w| w == b"ghp_query"));
    }

    #[tokio::test]
    async fn header_token_wins_over_query() {
        let fetcher = MockFetcher::replying(StatusCode::OK, b"data");
        let app = router(fetcher.clone(), CredentialResolver::default());

        let request = Request::builder()
            .uri("/o/r/main/f?token=from-query")
            .header(TOKEN_HEADER, "from-header")
            .body(Body::empty())
            .unwrap();
        send(app, request).await;

        let (_, authorization) = fetcher.calls().remove(0);
        assert_eq!(authorization.as_deref(), Some("token from-header"));
    }

    #[tokio::test]
    async fn store_token_for_repository() {
        let store = MemoryStore::new();
        store.insert("octocat/private", "ghp_repo");
        let resolver = CredentialResolver::new(
            Some(Arc::new(store) as Arc<dyn TokenStore>),
            "GITHUB_TOKENS",
            Some("ghp_fallback".into()),
        );
        let fetcher = MockFetcher::replying(StatusCode::OK, b"data");
        let app = router(fetcher.clone(), resolver);

        send(app, get("/octocat/private/main/a.png")).await;

        let (_, authorization) = fetcher.calls().remove(0);
        assert_eq!(authorization.as_deref(), Some("token ghp_repo"));
    }

    #[tokio::test]
    async fn upstream_401_becomes_denial() {
        let fetcher = MockFetcher::replying(StatusCode::UNAUTHORIZED, b"upstream says no");
        let app = router(fetcher, CredentialResolver::default());

        let request = Request::builder()
            .uri("/octocat/Hello-World/main/README.md")
            .header(TOKEN_HEADER, "bad")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(app, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain;charset=UTF-8");
        assert!(!body.is_empty());
        assert_ne!(&body[..], b"upstream says no");
        assert!(headers.get(header::CACHE_CONTROL).is_none());
    }

    #[tokio::test]
    async fn upstream_404_becomes_not_found() {
        let fetcher = MockFetcher::replying(StatusCode::NOT_FOUND, b"404: Not Found");
        let app = router(fetcher, CredentialResolver::default());

        let (status, _, body) = send(app, get("/octocat/Hello-World/nope/README.md")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.is_empty());
        assert_ne!(&body[..], b"404: Not Found");
    }

    #[tokio::test]
    async fn other_upstream_status_is_preserved() {
        let fetcher = MockFetcher::replying(StatusCode::BAD_GATEWAY, b"oops");
        let app = router(fetcher, CredentialResolver::default());

        let (status, _, body) = send(app, get("/o/r/main/f")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(String::from_utf8_lossy(&body).contains("502"));
    }

    #[tokio::test]
    async fn fetch_failure_is_500_with_description() {
        let fetcher = MockFetcher::failing("dns lookup failed");
        let app = router(fetcher, CredentialResolver::default());

        let (status, headers, body) = send(app, get("/o/r/main/f")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain;charset=UTF-8");
        assert!(String::from_utf8_lossy(&body).contains("dns lookup failed"));
    }

    #[tokio::test]
    async fn root_serves_info_page_without_fetching() {
        let fetcher = MockFetcher::replying(StatusCode::OK, b"unused");
        let app = router(fetcher.clone(), CredentialResolver::default());

        let request = Request::builder()
            .uri("/")
            .header(header::HOST, "cdn.example.com")
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/html;charset=UTF-8");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=86400");
        assert!(String::from_utf8_lossy(&body)
            .contains("http://cdn.example.com/{owner}/{repo}/{branch}/{path}"));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn options_adds_allow_headers() {
        let fetcher = MockFetcher::replying(StatusCode::OK, b"data");
        let app = router(fetcher, CredentialResolver::default());

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/o/r/main/f")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "X-GitHub-Token, Content-Type");
    }

    #[tokio::test]
    async fn unsupported_methods_are_rejected_before_fetching() {
        let fetcher = MockFetcher::replying(StatusCode::OK, b"data");
        let app = router(fetcher.clone(), CredentialResolver::default());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/o/r/main/f")
            .body(Body::from("payload"))
            .unwrap();
        let (status, headers, _) = send(app, request).await;

        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(headers[header::ALLOW], "GET, HEAD, OPTIONS");
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn incoming_request_id_is_propagated() {
        let fetcher = MockFetcher::replying(StatusCode::OK, b"data");
        let app = router(fetcher, CredentialResolver::default());

        let request = Request::builder()
            .uri("/o/r/main/f")
            .header(X_REQUEST_ID, "req-123")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(app, request).await;

        assert_eq!(headers[X_REQUEST_ID], "req-123");
    }
}
