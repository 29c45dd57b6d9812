//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardPath + Option<Credential>
//!     → UpstreamRequest (URL, Authorization header)
//!     → Fetch impl (reqwest in production, recording mock in tests)
//!     → UpstreamResponse (status, headers, fully buffered body)
//! ```
//!
//! # Design Decisions
//! - Always GET, no query string, no client headers forwarded
//! - Body fully materialised before the client response is built
//! - No timeout, no retry

pub mod client;

pub use client::{Fetch, FetchError, ReqwestFetcher, UpstreamRequest, UpstreamResponse};
