//! Error types for caddns
//!
//! Every fallible operation in the workspace returns [`Result`]. The variants
//! map one-to-one onto how a failure is handled: transport and provider
//! errors skip a single domain, `NotFound` aborts provisioning, `Scheduler`
//! is downgraded to a warning by the domain-set reconciler.

use thiserror::Error;

/// Result type alias for caddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for caddns
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure talking to the provider or the IP service
    /// (DNS resolution, connect, timeout, unreadable body)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider API answered with `success: false`
    #[error("Provider error {code}: {message}")]
    Provider {
        /// First error code reported by the API (or the HTTP status)
        code: i64,
        /// Provider-supplied error message(s)
        message: String,
    },

    /// Zone or record lookup returned zero results
    #[error("Not found: {0}")]
    NotFound(String),

    /// Public IP resolution failed
    #[error("IP resolution error: {0}")]
    Resolution(String),

    /// Installing or removing the OS trigger failed
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a provider error
    pub fn provider(code: i64, message: impl Into<String>) -> Self {
        Self::Provider {
            code,
            message: message.into(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an IP resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a scheduler error
    pub fn scheduler(msg: impl Into<String>) -> Self {
        Self::Scheduler(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True for failures the next scheduled run may not hit again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Resolution(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
