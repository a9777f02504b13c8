//! Error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
///
/// Validation variants are raised before any network I/O and block the
/// mutation that triggered them. Remote-execution variants are caught at the
/// executor boundary and turned into terminal statuses plus diagnostic text;
/// they never escape a reconciliation pass.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported auth type: {0}")]
    UnsupportedAuthType(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

// Convert anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Unexpected(err.to_string())
    }
}

impl Error {
    /// True for errors raised before any network I/O was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::UnsupportedAuthType(_) | Error::InvalidPrivateKey(_)
        )
    }
}
