//! Request handling and transformation.
//!
//! # Responsibilities
//! - Derive the forward path from the inbound request path
//! - Extract query parameters without ever forwarding the query string
//! - Redact credentials from anything that ends up in logs
//! - Request ID generation and propagation (UUID v4)
//!
//! # Design Decisions
//! - No percent-decoding or segment validation: malformed paths are
//!   forwarded as-is and rejected by the upstream
//! - The inbound query string is never part of the upstream URL

use std::fmt;

use axum::http::{HeaderName, Request, Uri};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::form_urlencoded;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const REDACTED: &str = "REDACTED";

/// Path forwarded to the upstream, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardPath(String);

impl ForwardPath {
    /// Strip exactly one leading `/`.
    ///
    /// Returns `None` for the root (`""` or `"/"`), which is served by the
    /// info page instead of the upstream.
    pub fn parse(path: &str) -> Option<Self> {
        if path.is_empty() || path == "/" {
            return None;
        }
        let forward = path.strip_prefix('/').unwrap_or(path);
        Some(Self(forward.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `owner/repo`: the first two segments joined by `/`. Shorter paths
    /// yield whatever segments exist.
    pub fn repo_key(&self) -> String {
        self.0.split('/').take(2).collect::<Vec<_>>().join("/")
    }
}

impl fmt::Display for ForwardPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// First value of `name` in a form-urlencoded query string.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Query string with every `name` value replaced by a placeholder.
pub fn redact_query(query: &str, name: &str) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == name {
            serializer.append_pair(&key, REDACTED);
        } else {
            serializer.append_pair(&key, &value);
        }
    }
    serializer.finish()
}

/// Path and query of `uri` suitable for logs.
pub fn loggable_uri(uri: &Uri, secret_param: &str) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", uri.path(), redact_query(query, secret_param)),
        None => uri.path().to_string(),
    }
}

/// Generates a fresh UUID v4 for requests that arrive without an id.
#[derive(Clone, Copy, Debug, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

/// Request id as set by the request-id layer, or "unknown".
pub fn request_id<B>(request: &Request<B>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
