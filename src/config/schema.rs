//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the raw-content proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream raw-content host.
    pub upstream: UpstreamConfig,

    /// Cache-control settings applied to successful responses.
    pub cache: CacheConfig,

    /// CORS settings applied to successful responses.
    pub cors: CorsConfig,

    /// Credential sources (key-value store, fallback secret).
    pub credentials: CredentialsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Host name of the raw-content server.
    pub host: String,

    /// URL scheme used for outbound requests ("https" or "http").
    pub scheme: String,

    /// User-Agent sent on outbound requests.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: "raw.githubusercontent.com".to_string(),
            scheme: "https".to_string(),
            user_agent: concat!("raw-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// `max-age` advertised to clients, in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 86_400 }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `access-control-allow-origin` ("*" or a site origin).
    pub allow_origin: String,

    /// Value of `access-control-max-age`, in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            max_age_secs: 86_400,
        }
    }
}

/// Credential resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Name of the key-value namespace holding tokens (used in logs).
    pub namespace: String,

    /// Process-wide fallback token. Overridden by `GITHUB_TOKEN`.
    pub fallback_token: Option<String>,

    /// Backing key-value store.
    pub store: StoreConfig,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            namespace: "GITHUB_TOKENS".to_string(),
            fallback_token: None,
            store: StoreConfig::None,
        }
    }
}

/// Key-value store backing the credential lookup.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreConfig {
    /// No store bound; lookups behave as "not found".
    #[default]
    None,

    /// Tokens listed inline in the config file.
    Memory {
        #[serde(default)]
        entries: HashMap<String, String>,
    },

    /// Tokens loaded once from a JSON object file (`{"owner/repo": "token"}`).
    File { path: String },

    /// Remote KV REST endpoint (`GET {endpoint}/values/{key}`).
    Http {
        endpoint: String,
        #[serde(default)]
        api_token: Option<String>,
    },
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.upstream.host, "raw.githubusercontent.com");
        assert_eq!(config.upstream.scheme, "https");
        assert_eq!(config.cache.ttl_secs, 86_400);
        assert_eq!(config.cors.allow_origin, "*");
        assert_eq!(config.credentials.namespace, "GITHUB_TOKENS");
        assert_eq!(config.credentials.store, StoreConfig::None);
    }

    #[test]
    fn parses_tagged_store() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [credentials.store]
            kind = "memory"
            entries = { default_token = "abc", "octocat/private" = "def" }
            "#,
        )
        .unwrap();

        match config.credentials.store {
            StoreConfig::Memory { entries } => {
                assert_eq!(entries.get("default_token").map(String::as_str), Some("abc"));
                assert_eq!(entries.get("octocat/private").map(String::as_str), Some("def"));
            }
            other => panic!("unexpected store: {:?}", other),
        }
    }

    #[test]
    fn parses_http_store() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [credentials]
            namespace = "TOKENS"

            [credentials.store]
            kind = "http"
            endpoint = "https://kv.example.com/namespaces/abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.credentials.namespace, "TOKENS");
        assert_eq!(
            config.credentials.store,
            StoreConfig::Http {
                endpoint: "https://kv.example.com/namespaces/abc".to_string(),
                api_token: None,
            }
        );
    }
}
