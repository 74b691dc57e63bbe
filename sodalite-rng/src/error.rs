//! RNG error types.

use sodalite_entropy::EntropyError;
use thiserror::Error;

/// Result type for RNG seeding.
pub type RngResult<T> = Result<T, RngError>;

/// Errors that can occur while seeding the generator.
///
/// Drawing from a seeded generator cannot fail.
#[derive(Debug, Error)]
pub enum RngError {
    #[error("RNG initialization failed: {0}")]
    Initialization(#[from] EntropyError),
}
