//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply GITHUB_TOKEN override)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → consumed once at startup to build the handler state
//! ```
//!
//! # Design Decisions
//! - Config is fixed at deploy time; there is no reload path
//! - All fields have defaults so an absent or empty file is valid
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CacheConfig, CorsConfig, CredentialsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig,
    StoreConfig, UpstreamConfig,
};
