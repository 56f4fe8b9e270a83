//! Error types for the cityscope crate.
//!
//! All errors carry stable string messages suitable for display to users.
//! No API keys or other credentials ever appear in error messages.

/// Errors that can occur while searching image providers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// Every enabled connector failed during a single run.
    #[error("all image providers failed: {0}")]
    AllConnectorsFailed(String),

    /// A connector did not respond within the configured timeout.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a provider failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A provider response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for cityscope results.
pub type Result<T> = std::result::Result<T, SearchError>;
