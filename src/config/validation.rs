//! Configuration validation.
//!
//! Serde handles syntax; this pass checks values that would only fail at
//! request time (unparseable addresses, header values that cannot be encoded).
//! All errors are collected, not just the first.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::{ProxyConfig, StoreConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("upstream.host '{0}' must be a bare host name")]
    UpstreamHost(String),

    #[error("upstream.scheme '{0}' must be http or https")]
    UpstreamScheme(String),

    #[error("cors.allow_origin '{0}' is not a valid header value")]
    AllowOrigin(String),

    #[error("credentials.store endpoint '{0}' is not a valid URL")]
    StoreEndpoint(String),

    #[error("credentials.store path must not be empty")]
    StorePath,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let host = &config.upstream.host;
    if host.is_empty() || host.contains(['/', '?', '#', ' ']) {
        errors.push(ValidationError::UpstreamHost(host.clone()));
    }

    if !matches!(config.upstream.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::UpstreamScheme(config.upstream.scheme.clone()));
    }

    if HeaderValue::from_str(&config.cors.allow_origin).is_err() {
        errors.push(ValidationError::AllowOrigin(config.cors.allow_origin.clone()));
    }

    match &config.credentials.store {
        StoreConfig::Http { endpoint, .. } if url::Url::parse(endpoint).is_err() => {
            errors.push(ValidationError::StoreEndpoint(endpoint.clone()));
        }
        StoreConfig::File { path } if path.is_empty() => {
            errors.push(ValidationError::StorePath);
        }
        _ => {}
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
