//! Error types for the zonesync system
//!
//! This module defines all error types used throughout the crate.
//! The reconciler itself never fails; every variant here belongs to
//! configuration or to the network-facing collaborators.

use thiserror::Error;

/// Result type alias for zonesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the zonesync system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal before any network call)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inventory source errors
    #[error("Inventory error: {0}")]
    Inventory(String),

    /// A snapshot could not be fetched for the current run
    #[error("Failed to fetch {what}: {message}")]
    Fetch {
        /// What was being fetched ("inventory" or "zone")
        what: &'static str,
        /// Underlying error message
        message: String,
    },

    /// The batch of changes could not be applied
    #[error("Failed to apply changes: {0}")]
    Apply(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an inventory error
    pub fn inventory(msg: impl Into<String>) -> Self {
        Self::Inventory(msg.into())
    }

    /// Create a fetch error for the named snapshot
    pub fn fetch(what: &'static str, msg: impl Into<String>) -> Self {
        Self::Fetch {
            what,
            message: msg.into(),
        }
    }

    /// Create an apply error
    pub fn apply(msg: impl Into<String>) -> Self {
        Self::Apply(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
