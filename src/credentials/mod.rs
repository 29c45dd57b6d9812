//! Credential resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (headers, query) + ForwardPath
//!     → resolver.rs (ordered fallback chain)
//!         1. X-GitHub-Token header
//!         2. ?token= query parameter
//!         3. store.rs "default_token"
//!         4. store.rs "{owner}/{repo}"
//!         5. fallback secret from config / GITHUB_TOKEN
//!     → Option<(Credential, CredentialSource)>
//!     → upstream request Authorization header
//! ```
//!
//! # Design Decisions
//! - No credential is a valid outcome (public repositories)
//! - Store failures degrade to "not found"; resolution never errors
//! - The credential value is redacted from Debug/Display and never logged

pub mod resolver;
pub mod store;

use std::fmt;

pub use resolver::{CredentialResolver, DEFAULT_TOKEN_KEY, TOKEN_HEADER, TOKEN_QUERY_PARAM};
pub use store::{build_store, MemoryStore, HttpStore, StoreError, TokenStore};

/// An opaque access token for the upstream host.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token. Empty strings are not credentials.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// Value for the outbound `Authorization` header.
    pub fn authorization_value(&self) -> String {
        format!("token {}", self.0)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Header,
    Query,
    Store { key: String },
    Fallback,
}

impl CredentialSource {
    /// Low-cardinality label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Query => "query",
            Self::Store { .. } => "store",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store { key } => write!(f, "store:{}", key),
            other => f.write_str(other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_not_a_credential() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("ghp_abc").is_some());
    }

    #[test]
    fn formatting_never_leaks_value() {
        let credential = Credential::new("ghp_secret").unwrap();
        assert!(!format!("{:?}", credential).contains("ghp_secret"));
        assert!(!credential.to_string().contains("ghp_secret"));
        assert_eq!(credential.authorization_value(), "token ghp_secret");
    }

    #[test]
    fn source_display() {
        let source = CredentialSource::Store { key: "octocat/repo".into() };
        assert_eq!(source.to_string(), "store:octocat/repo");
        assert_eq!(source.label(), "store");
        assert_eq!(CredentialSource::Header.to_string(), "header");
    }
}
