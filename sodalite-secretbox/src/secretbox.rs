//! XSalsa20-Poly1305 sealing.
//!
//! Wire layout is `tag (16) || ciphertext`, identical to NaCl's
//! `crypto_secretbox_easy`. The Poly1305 key is the first 32 bytes of the
//! XSalsa20 keystream; the message is encrypted with the bytes after it.

use crate::error::{SecretBoxError, SecretBoxResult};
use crate::key::{Nonce, SecretKey};
use poly1305::universal_hash::KeyInit;
use poly1305::Poly1305;
use salsa20::cipher::consts::U10;
use salsa20::cipher::generic_array::GenericArray;
use salsa20::cipher::{KeyIvInit, StreamCipher};
use salsa20::{hsalsa, XSalsa20};
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

/// Poly1305 tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Result of [`open`]: the decrypted bytes bound to their authentication
/// verdict.
///
/// The plaintext is only reachable through [`verify`](Self::verify), which
/// refuses it when the tag did not match.
pub struct Opened {
    plaintext: Zeroizing<Vec<u8>>,
    authentic: bool,
}

impl Opened {
    /// Whether the tag matched.
    pub fn is_authentic(&self) -> bool {
        self.authentic
    }

    /// Length of the decrypted message.
    pub fn len(&self) -> usize {
        self.plaintext.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plaintext.is_empty()
    }

    /// Returns the plaintext if the tag matched. Otherwise the decrypted
    /// bytes are wiped and [`SecretBoxError::Authentication`] is returned.
    pub fn verify(self) -> SecretBoxResult<Zeroizing<Vec<u8>>> {
        if self.authentic {
            Ok(self.plaintext)
        } else {
            Err(SecretBoxError::Authentication)
        }
    }
}

impl fmt::Debug for Opened {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opened")
            .field("len", &self.plaintext.len())
            .field("authentic", &self.authentic)
            .finish_non_exhaustive()
    }
}

/// Keyed XSalsa20 positioned past the one-time MAC key, plus that MAC.
fn init(key: &SecretKey, nonce: &Nonce) -> (XSalsa20, Poly1305) {
    let mut cipher = XSalsa20::new(
        salsa20::Key::from_slice(key.as_bytes()),
        salsa20::XNonce::from_slice(nonce.as_bytes()),
    );

    let mut mac_key = Zeroizing::new([0u8; 32]);
    cipher.apply_keystream(&mut mac_key[..]);
    let mac = Poly1305::new(poly1305::Key::from_slice(&mac_key[..]));

    (cipher, mac)
}

/// Encrypts and authenticates `msg`. Output is `msg.len() + TAG_SIZE` bytes.
pub fn seal(key: &SecretKey, nonce: &Nonce, msg: &[u8]) -> Vec<u8> {
    let (mut cipher, mac) = init(key, nonce);

    let mut sealed = vec![0u8; TAG_SIZE + msg.len()];
    let (tag, body) = sealed.split_at_mut(TAG_SIZE);
    body.copy_from_slice(msg);
    cipher.apply_keystream(body);
    tag.copy_from_slice(&mac.compute_unpadded(body));

    sealed
}

/// Verifies and decrypts a sealed box.
///
/// Decryption always runs. Use [`Opened::verify`] (or [`open_verified`]) to
/// get at the plaintext.
pub fn open(key: &SecretKey, nonce: &Nonce, sealed: &[u8]) -> SecretBoxResult<Opened> {
    if sealed.len() < TAG_SIZE {
        return Err(SecretBoxError::TooShort { len: sealed.len() });
    }

    let (tag, body) = sealed.split_at(TAG_SIZE);
    let (mut cipher, mac) = init(key, nonce);

    let expected = mac.compute_unpadded(body);
    let authentic: bool = expected.as_slice().ct_eq(tag).into();

    let mut plaintext = Zeroizing::new(body.to_vec());
    cipher.apply_keystream(&mut plaintext);

    if !authentic {
        debug!("secret box rejected: tag mismatch on {} byte input", sealed.len());
    }

    Ok(Opened {
        plaintext,
        authentic,
    })
}

/// [`open`] followed by [`Opened::verify`].
pub fn open_verified(
    key: &SecretKey,
    nonce: &Nonce,
    sealed: &[u8],
) -> SecretBoxResult<Zeroizing<Vec<u8>>> {
    open(key, nonce, sealed)?.verify()
}

/// Turns a 32-byte shared secret (e.g. an X25519 output) into a secret box
/// key with HSalsa20 over a zero nonce, as NaCl's `crypto_box_beforenm`.
pub fn derive(secret: &[u8; 32]) -> SecretKey {
    let mut out = hsalsa::<U10>(salsa20::Key::from_slice(secret), &GenericArray::default());

    let mut key = [0u8; 32];
    key.copy_from_slice(&out);
    out.as_mut_slice().zeroize();

    let derived = SecretKey::from_bytes(key);
    key.zeroize();
    derived
}
