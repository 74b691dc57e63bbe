//! Entropy sources for sodalite.
//!
//! Provides the raw inputs a CSPRNG is seeded from:
//! - The OS entropy pool (required)
//! - RDSEED/RDRAND hardware output (optional)
//! - Process and environment state (optional)
//! - A cycle counter, used only as timing noise
//!
//! # Architecture
//!
//! Every source sits behind the [`EntropySource`] capability trait so a
//! seeder can probe each one independently and a platform or test can swap
//! in its own backend. [`SystemEntropy`] is the default backend; which of its
//! optional sources are consulted is controlled by [`EntropyConfig`].
//!
//! No source here is expected to be sufficient alone. Callers hash all of
//! them together, so a weak or compromised optional source cannot lower the
//! entropy the OS pool provides.

mod config;
mod env;
mod error;
mod hw;
mod os;
mod system;

pub use config::EntropyConfig;
pub use error::{EntropyError, EntropyResult};
pub use system::SystemEntropy;

/// A set of entropy probes.
///
/// `sysrand` is the only required source. `hwrand` and `envrand` are best
/// effort: an `Err` means "skip this source", never "abort". `rdrand` and
/// `rdtsc` feed supplementary noise and must never be the sole input.
pub trait EntropySource {
    /// Fills `dst` from the operating system CSPRNG. May block until the
    /// platform pool has been seeded.
    fn sysrand(&mut self, dst: &mut [u8]) -> EntropyResult<()>;

    /// Fills `dst` from a hardware RNG.
    fn hwrand(&mut self, dst: &mut [u8]) -> EntropyResult<()>;

    /// Fills `dst` with entropy derived from process and environment state.
    fn envrand(&mut self, dst: &mut [u8; 64]) -> EntropyResult<()>;

    /// Whether [`rdrand`](Self::rdrand) produces hardware output.
    fn has_rdrand(&self) -> bool;

    /// A single hardware random word. Only meaningful when
    /// [`has_rdrand`](Self::has_rdrand) is true.
    fn rdrand(&mut self) -> u32;

    /// A cycle-counter sample.
    fn rdtsc(&self) -> u64;
}

/// Fills `dst` straight from the OS pool, bypassing any DRBG.
pub fn sysrand(dst: &mut [u8]) -> EntropyResult<()> {
    os::sysrand(dst)
}
