//! Ordered credential fallback chain.

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName};

use crate::credentials::{Credential, CredentialSource, TokenStore};
use crate::http::request::{query_param, ForwardPath};
use crate::observability::metrics;

/// Request header carrying a client-supplied token.
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("x-github-token");

/// Query parameter carrying a client-supplied token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Store key consulted before the per-repository key.
pub const DEFAULT_TOKEN_KEY: &str = "default_token";

/// Resolves the credential for a request.
///
/// The store and the fallback secret are both optional; an absent store
/// behaves exactly like one that has no matching key.
#[derive(Clone, Default)]
pub struct CredentialResolver {
    store: Option<Arc<dyn TokenStore>>,
    namespace: String,
    fallback: Option<Credential>,
}

impl CredentialResolver {
    pub fn new(
        store: Option<Arc<dyn TokenStore>>,
        namespace: impl Into<String>,
        fallback: Option<String>,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            fallback: fallback.and_then(Credential::new),
        }
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Walk the chain and return the first non-empty credential:
    /// header, query parameter, store `default_token`, store `owner/repo`,
    /// then the fallback secret.
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        query: Option<&str>,
        path: &ForwardPath,
    ) -> Option<(Credential, CredentialSource)> {
        let from_header = headers.get(&TOKEN_HEADER).and_then(|value| match value.to_str() {
            Ok(token) => Credential::new(token),
            Err(_) => {
                tracing::debug!(header = %TOKEN_HEADER, "Ignoring token header with non-ASCII bytes");
                None
            }
        });
        if let Some(credential) = from_header {
            return Some((credential, CredentialSource::Header));
        }

        if let Some(credential) = query_param(query, TOKEN_QUERY_PARAM).and_then(Credential::new) {
            return Some((credential, CredentialSource::Query));
        }

        if let Some(found) = self.from_store(path).await {
            return Some(found);
        }

        self.fallback
            .clone()
            .map(|credential| (credential, CredentialSource::Fallback))
    }

    async fn from_store(&self, path: &ForwardPath) -> Option<(Credential, CredentialSource)> {
        let store = self.store.as_ref()?;

        if let Some(credential) = self.lookup(store.as_ref(), DEFAULT_TOKEN_KEY).await {
            return Some((
                credential,
                CredentialSource::Store {
                    key: DEFAULT_TOKEN_KEY.to_string(),
                },
            ));
        }

        let repo_key = path.repo_key();
        if repo_key.is_empty() {
            return None;
        }
        let credential = self.lookup(store.as_ref(), &repo_key).await?;
        Some((credential, CredentialSource::Store { key: repo_key }))
    }

    /// Store errors are logged and treated as a miss.
    async fn lookup(&self, store: &dyn TokenStore, key: &str) -> Option<Credential> {
        match store.get(key).await {
            Ok(value) => value.and_then(Credential::new),
            Err(e) => {
                tracing::warn!(
                    namespace = %self.namespace,
                    key = %key,
                    error = %e,
                    "Token store lookup failed"
                );
                metrics::record_store_error();
                None
            }
        }
    }
}
