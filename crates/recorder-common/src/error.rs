//! Common error types for the SRV recorder.

use thiserror::Error;

/// Result alias used by every store, cache, membership and publisher call
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Errors that end a recorder run.
///
/// Degraded conditions (cache miss, failed cleanup) are logged where they
/// happen and never surface as a `RecorderError`.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lease Store (coordination service) transport or protocol error
    #[error("Lease store error: {0}")]
    Store(String),

    /// Local lease cache could not be written
    #[error("Lease cache error: {0}")]
    Cache(String),

    /// Cluster membership listing failed
    #[error("Membership error: {0}")]
    Membership(String),

    /// DNS record publication failed
    #[error("DNS error: {0}")]
    Dns(String),

    /// Encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RecorderError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Store(_)
            | Self::Cache(_)
            | Self::Membership(_)
            | Self::Dns(_)
            | Self::Serialization(_) => 1,
        }
    }

    /// Returns true for errors raised by the coordination service
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<serde_json::Error> for RecorderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
