//! Client-facing error taxonomy.

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::security::headers::ALLOWED_METHODS;
use crate::upstream::FetchError;

pub const TEXT_PLAIN_UTF8: &str = "text/plain;charset=UTF-8";

/// Every way a proxied request can fail. Messages never contain credentials.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Upstream answered 401.
    #[error("Access denied: the GitHub token is invalid or lacks permission for this resource")]
    Unauthorized,

    /// Upstream answered 404.
    #[error("Resource not found: check the repository name, branch and file path")]
    NotFound,

    /// Upstream answered any other non-2xx status.
    #[error("GitHub request failed: {}", describe_status(.0))]
    Upstream(StatusCode),

    /// The pipeline itself failed (network, malformed URL, bad header).
    #[error("Proxy request failed: {0}")]
    Transport(String),

    #[error("Method {0} is not allowed")]
    MethodNotAllowed(Method),
}

impl ProxyError {
    /// Classify a non-2xx upstream status.
    pub fn from_upstream_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound,
            other => Self::Upstream(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Upstream(status) => *status,
            Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// `503 Service Unavailable`, or just `599` when the code has no reason.
fn describe_status(status: &StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Render an error and every cause beneath it, joined by `": "`.
fn describe_chain(err: &dyn std::error::Error) -> String {
    let mut description = err.to_string();
    let mut previous = description.clone();
    let mut source = err.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        // Some layers repeat their inner error verbatim.
        if message != previous && !previous.ends_with(&message) {
            description.push_str(": ");
            description.push_str(&message);
        }
        previous = message;
        source = cause.source();
    }
    description
}

impl From<FetchError> for ProxyError {
    fn from(err: FetchError) -> Self {
        Self::Transport(describe_chain(&err))
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8))],
            self.to_string(),
        )
            .into_response();

        if let Self::MethodNotAllowed(_) = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        response
    }
}
