//! Operating system entropy pool.
//!
//! Backed by `getrandom`, which picks the platform call (`getrandom(2)`,
//! `getentropy`, `BCryptGenRandom`, `random_get` on WASI, ...). On Linux
//! the call blocks until the kernel pool has been initialized, so early-boot
//! callers can observe a delay here.

use crate::error::{EntropyError, EntropyResult};

/// Fills `dst` from the OS CSPRNG.
pub(crate) fn sysrand(dst: &mut [u8]) -> EntropyResult<()> {
    if dst.is_empty() {
        return Ok(());
    }

    getrandom::fill(dst).map_err(|e| EntropyError::Os(e.to_string()))
}
