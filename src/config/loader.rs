//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable holding the process-wide fallback token.
pub const FALLBACK_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// With no path the built-in defaults are used. Environment overrides are
/// applied before validation in both cases.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_fallback_token(&mut config, std::env::var(FALLBACK_TOKEN_ENV).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// An environment-provided token wins over the one in the file. Empty values
/// are ignored.
fn apply_fallback_token(config: &mut ProxyConfig, env_token: Option<String>) {
    if let Some(token) = env_token.filter(|t| !t.is_empty()) {
        config.credentials.fallback_token = Some(token);
    }
}
