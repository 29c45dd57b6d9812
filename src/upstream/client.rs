//! Outbound client for the raw-content host.

use std::time::Instant;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::credentials::Credential;
use crate::http::request::ForwardPath;
use crate::observability::metrics;

/// Failure to obtain a complete upstream response.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid upstream URL '{0}'")]
    InvalidUrl(String),

    #[error("invalid authorization header value")]
    InvalidCredential,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// A fully described outbound request. The method is always GET.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub credential: Option<Credential>,
}

impl UpstreamRequest {
    /// `{scheme}://{host}/{forward_path}`; the inbound query is never appended.
    pub fn new(
        config: &UpstreamConfig,
        path: &ForwardPath,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            url: format!("{}://{}/{}", config.scheme, config.host, path),
            credential,
        }
    }

    /// Headers sent upstream. Nothing from the client is copied.
    pub fn headers(&self) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        if let Some(credential) = &self.credential {
            let mut value = HeaderValue::from_str(&credential.authorization_value())
                .map_err(|_| FetchError::InvalidCredential)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

/// Upstream response with its body fully in memory.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Performs upstream fetches.
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, FetchError>>;
}

/// `reqwest`-backed fetcher.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse, FetchError> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|_| FetchError::InvalidUrl(request.url.clone()))?;
        let headers = request.headers()?;

        let start = Instant::now();
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        metrics::record_upstream(status.as_u16(), start);

        tracing::debug!(
            status = %status,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

impl Fetch for ReqwestFetcher {
    fn fetch(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, FetchError>> {
        self.execute(request).boxed()
    }
}
