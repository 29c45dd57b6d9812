//! Response header rewriting.
//!
//! # Responsibilities
//! - Overwrite cache-control with the configured TTL
//! - Set CORS headers (plus allow-headers on preflight)
//! - Set fixed security headers
//! - Strip hop-by-hop headers copied from the upstream
//!
//! # Design Decisions
//! - Header values are encoded once at startup, not per request
//! - Everything else from the upstream (content-type, etag, ...) passes through

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::{CacheConfig, CorsConfig};

pub const ALLOWED_METHODS: &str = "GET, HEAD, OPTIONS";
pub const ALLOWED_HEADERS: &str = "X-GitHub-Token, Content-Type";

/// Connection-scoped headers that must not be relayed.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const SECURITY_HEADERS: [(HeaderName, &str); 4] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::X_XSS_PROTECTION, "1; mode=block"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
];

/// Fixed, request-independent header overrides for successful responses.
#[derive(Debug, Clone)]
pub struct ResponseHeaderPolicy {
    cache_control: HeaderValue,
    allow_origin: HeaderValue,
    max_age: HeaderValue,
}

impl ResponseHeaderPolicy {
    /// Fails only if `allow_origin` cannot be a header value, which
    /// config validation already rejects.
    pub fn new(cache: &CacheConfig, cors: &CorsConfig) -> Result<Self, header::InvalidHeaderValue> {
        Ok(Self {
            cache_control: cache_control_value(cache.ttl_secs),
            allow_origin: HeaderValue::from_str(&cors.allow_origin)?,
            max_age: HeaderValue::from(cors.max_age_secs),
        })
    }

    pub fn cache_control(&self) -> &HeaderValue {
        &self.cache_control
    }

    /// Rewrite upstream headers in place.
    pub fn apply(&self, headers: &mut HeaderMap, preflight: bool) {
        for name in &HOP_BY_HOP {
            headers.remove(name);
        }

        headers.insert(header::CACHE_CONTROL, self.cache_control.clone());

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        if preflight {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static(ALLOWED_HEADERS),
            );
        }

        for (name, value) in SECURITY_HEADERS {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
}

/// `public, max-age={ttl}`
pub fn cache_control_value(ttl_secs: u64) -> HeaderValue {
    HeaderValue::from_str(&format!("public, max-age={}", ttl_secs))
        .unwrap_or_else(|_| HeaderValue::from_static("public"))
}
