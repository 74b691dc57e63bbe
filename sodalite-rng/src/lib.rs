//! Forward-secure CSPRNG for sodalite.
//!
//! Provides a ChaCha20 generator seeded from:
//! - The OS entropy pool (required)
//! - Hardware RNG output (optional)
//! - Process and environment state (optional)
//!
//! # Architecture
//!
//! Seeding hashes every source with SHA-512 and reduces the digest with
//! HChaCha20 into a 256-bit key, a 64-bit counter base and a 64-bit nonce.
//!
//! Every draw then:
//! 1. Encrypts zeros with ChaCha20 under the current key and nonce
//! 2. Folds the draw length, and optionally one hardware word, into the key
//! 3. Increments the nonce
//! 4. Rekeys by XORing the key with its own keystream
//!
//! There is no global instance. Each [`Rng`] is owned by its caller and
//! must be reseeded in a forked child.
//!
//! ```no_run
//! use sodalite_rng::Rng;
//!
//! let mut rng = Rng::new()?;
//! let mut key = [0u8; 32];
//! rng.generate(&mut key);
//! let die = rng.uniform(6) + 1;
//! # let _ = die;
//! # Ok::<(), sodalite_rng::RngError>(())
//! ```

mod error;
mod rng;
mod seed;

pub use error::{RngError, RngResult};
pub use rng::Rng;
pub use sodalite_entropy::{EntropyConfig, EntropySource, SystemEntropy};
