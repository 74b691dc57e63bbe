//! Entropy source error types.

use thiserror::Error;

/// Result type for entropy acquisition.
pub type EntropyResult<T> = Result<T, EntropyError>;

/// Errors that can occur while reading an entropy source.
#[derive(Debug, Error)]
pub enum EntropyError {
    #[error("OS entropy source failed: {0}")]
    Os(String),

    #[error("{0} entropy source is unavailable")]
    Unavailable(&'static str),

    #[error("{0} entropy source is disabled by configuration")]
    Disabled(&'static str),
}
