//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Successful upstream response:
//!     → headers.rs (strip hop-by-hop, set cache/CORS/security headers)
//!     → returned to client
//! ```
//!
//! # Design Decisions
//! - Only 2xx responses are rewritten; error responses are plain text
//! - Credentials never reach the client; the Authorization header exists
//!   only on the outbound request

pub mod headers;

pub use headers::ResponseHeaderPolicy;
