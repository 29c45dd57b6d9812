//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handler, resolver and upstream client produce:
//!     → logging.rs (tracing subscriber, env filter)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log lines
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the trace span of every request
//! - Credentials are never recorded; only their source is

pub mod logging;
pub mod metrics;
