//! Raw-content reverse proxy library.
//!
//! Rewrites `/{owner}/{repo}/{ref}/{path}` onto a raw-content host,
//! attaching a token resolved from the request, a key-value store or a
//! fallback secret.

pub mod config;
pub mod credentials;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod upstream;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
