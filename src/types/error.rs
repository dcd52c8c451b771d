//! Error types for Almoner
//!
//! Read-path failures are absorbed at the adapter boundary and folded into
//! absence; these types cover the cases that remain visible to callers.

/// Main error type for Almoner operations
#[derive(Debug, thiserror::Error)]
pub enum AlmonerError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Wallet or ledger declined the transfer. The payload is the adapter's
    /// message, surfaced unchanged.
    #[error("{0}")]
    TransferRejected(String),

    /// Confirmation never arrived; the transfer's actual outcome is unknown.
    #[error("{0}")]
    FinalityTimeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// Implement From conversions for common error types

impl From<reqwest::Error> for AlmonerError {
    fn from(err: reqwest::Error) -> Self {
        Self::SourceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AlmonerError {
    fn from(err: serde_json::Error) -> Self {
        Self::SourceUnavailable(format!("JSON error: {}", err))
    }
}

impl From<mongodb::error::Error> for AlmonerError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for Almoner operations
pub type Result<T> = std::result::Result<T, AlmonerError>;

/// Failure modes of the value-transfer capability.
///
/// Both variants carry the adapter's message unchanged so the user sees the
/// wallet's own diagnosis.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransferError {
    /// Wallet denial, insufficient balance, or network failure at submission.
    #[error("{0}")]
    Rejected(String),

    /// The submitted transfer was not confirmed within the adapter's bounds.
    #[error("{0}")]
    FinalityTimeout(String),
}
