//! Key-value token stores.
//!
//! # Responsibilities
//! - Define the read-only `TokenStore` seam consumed by the resolver
//! - In-memory store (inline config table or JSON file loaded at startup)
//! - HTTP store speaking the KV REST shape `GET {endpoint}/values/{key}`
//!
//! # Design Decisions
//! - Stores only read; nothing in the proxy writes tokens
//! - "Missing key" is `Ok(None)`, never an error
//! - Empty values are reported as missing

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::config::StoreConfig;

/// Errors raised by a token store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not a JSON object of strings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid store endpoint '{0}'")]
    Endpoint(String),

    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store returned status {0}")]
    Status(StatusCode),
}

/// A read-only string lookup.
pub trait TokenStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;
}

/// Concurrent in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object of `key -> token` from disk.
    pub fn load_json(path: &Path) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path)?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)?;
        tracing::info!(path = ?path, entries = entries.len(), "Loaded token store file");
        Ok(Self::from_iter(entries))
    }

    pub fn insert(&self, key: impl Into<String>, token: impl Into<String>) {
        self.inner.insert(key.into(), token.into());
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(String, String)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl TokenStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        let value = self
            .inner
            .get(key)
            .map(|entry| entry.value().clone())
            .filter(|v| !v.is_empty());
        futures_util::future::ready(Ok(value)).boxed()
    }
}

/// Remote KV namespace reached over HTTP.
#[derive(Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    endpoint: Url,
    api_token: Option<String>,
}

impl HttpStore {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        api_token: Option<String>,
    ) -> Result<Self, StoreError> {
        let endpoint =
            Url::parse(endpoint).map_err(|_| StoreError::Endpoint(endpoint.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(StoreError::Endpoint(endpoint.to_string()));
        }
        Ok(Self {
            client,
            endpoint,
            api_token,
        })
    }

    /// `{endpoint}/values/{key}` with the key as a single encoded segment,
    /// so `owner/repo` becomes `owner%2Frepo`.
    fn value_url(&self, key: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("values").push(key);
        }
        url
    }

    async fn fetch(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut request = self.client.get(self.value_url(key));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let value = response.text().await?;
                Ok(Some(value).filter(|v| !v.is_empty()))
            }
            status => Err(StoreError::Status(status)),
        }
    }
}

impl TokenStore for HttpStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        self.fetch(key).boxed()
    }
}

/// Build the configured store, if any.
pub fn build_store(
    config: &StoreConfig,
    client: &reqwest::Client,
) -> Result<Option<Arc<dyn TokenStore>>, StoreError> {
    let store: Arc<dyn TokenStore> = match config {
        StoreConfig::None => return Ok(None),
        StoreConfig::Memory { entries } => {
            Arc::new(entries.clone().into_iter().collect::<MemoryStore>())
        }
        StoreConfig::File { path } => Arc::new(MemoryStore::load_json(Path::new(path))?),
        StoreConfig::Http { endpoint, api_token } => {
            Arc::new(HttpStore::new(client.clone(), endpoint, api_token.clone())?)
        }
    };
    Ok(Some(store))
}
