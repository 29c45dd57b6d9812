//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → request.rs (forward path, query extraction, redaction)
//!         `/` → info.rs (usage page)
//!     → credentials (resolve token)
//!     → upstream (fetch, fully buffered)
//!     → response.rs (translate status, rewrite headers)
//!     → error.rs (plain-text failures)
//!     → Send to client
//! ```

pub mod error;
pub mod info;
pub mod request;
pub mod response;
pub mod server;

pub use error::ProxyError;
pub use request::{ForwardPath, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer, ServerError};
