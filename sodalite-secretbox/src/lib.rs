//! Secret-key authenticated encryption for sodalite.
//!
//! Provides NaCl's `crypto_secretbox` construction:
//! - XSalsa20 for encryption (192-bit nonce, safe to draw at random)
//! - Poly1305 for authentication, keyed from the cipher's first 32 bytes
//! - HSalsa20 to turn a shared secret into a box key
//!
//! Sealed boxes are `tag || ciphertext` and interoperate byte for byte with
//! libsodium and the RustCrypto `crypto_secretbox` crate.
//!
//! ```
//! use sodalite_secretbox::{open_verified, seal, Nonce, SecretKey};
//!
//! let key = SecretKey::from_bytes([7u8; 32]);
//! let nonce = Nonce::from_bytes([1u8; 24]);
//!
//! let sealed = seal(&key, &nonce, b"attack at dawn");
//! let plaintext = open_verified(&key, &nonce, &sealed)?;
//! assert_eq!(plaintext.as_slice(), b"attack at dawn");
//! # Ok::<(), sodalite_secretbox::SecretBoxError>(())
//! ```
//!
//! All functions are stateless and reentrant. Cipher and MAC state is wiped
//! before each returns.

mod error;
mod key;
mod secretbox;

pub use error::{SecretBoxError, SecretBoxResult};
pub use key::{KEY_SIZE, NONCE_SIZE, Nonce, SecretKey};
pub use secretbox::{derive, open, open_verified, seal, Opened, TAG_SIZE};
