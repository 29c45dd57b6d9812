//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map upstream failure statuses to friendly plain-text responses
//! - Relay successful bodies byte-for-byte
//! - Apply the fixed header policy to successful responses
//!
//! # Design Decisions
//! - Upstream error bodies are never relayed
//! - The body is already fully buffered; nothing here can truncate

use axum::body::Body;
use axum::response::Response;

use crate::http::error::ProxyError;
use crate::security::ResponseHeaderPolicy;
use crate::upstream::UpstreamResponse;

/// Turn an upstream response into the client response.
pub fn translate(
    upstream: UpstreamResponse,
    policy: &ResponseHeaderPolicy,
    preflight: bool,
) -> Result<Response, ProxyError> {
    if !upstream.status.is_success() {
        return Err(ProxyError::from_upstream_status(upstream.status));
    }

    let UpstreamResponse {
        status,
        mut headers,
        body,
    } = upstream;
    policy.apply(&mut headers, preflight);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
