//! Error types for Party 2 operations

use thiserror::Error;

/// Result type alias for Party 2 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the protocol driver and its collaborators.
///
/// None of these are retried internally. Retrying a signing session risks
/// nonce reuse, so the caller decides what happens next.
#[derive(Debug, Error)]
pub enum Error {
    /// Party 1 unreachable, connection dropped, or the call timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Party 1 rejected the request or the exchange did not check out
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A field failed decoding (bad hex, wrong length, out-of-range scalar, invalid point)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// A local precondition was violated before any call was attempted
    #[error("Precondition failed: {0}")]
    Precondition(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}
