//! Secret box error types.

use thiserror::Error;

/// Result type for opening a secret box.
pub type SecretBoxResult<T> = Result<T, SecretBoxError>;

/// Errors from opening a sealed box. Either way, discard any plaintext.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretBoxError {
    #[error("sealed box too short: {len} bytes, need at least 16")]
    TooShort { len: usize },

    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,
}
