//! Seed mixer.
//!
//! Every available source is hashed into one SHA-512 context together with
//! address and cycle-counter noise. The 64-byte digest is then split into
//! the generator's key, counter base and nonce, with the first 48 bytes
//! compressed to a 32-byte key by HChaCha20 so no digest byte is discarded.

use crate::error::RngResult;
use chacha20::cipher::consts::U10;
use chacha20::hchacha;
use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha512};
use sodalite_entropy::EntropySource;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const OS_BYTES: usize = 64;
const HW_BYTES: usize = 32;
const ENV_BYTES: usize = 64;

/// Initial generator state produced by one seeding pass.
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct SeedMaterial {
    pub(crate) key: [u8; 32],
    pub(crate) zero: u64,
    pub(crate) nonce: u64,
}

/// Collects entropy from `source` and derives fresh generator state.
///
/// Fails only when the OS pool fails. The hardware and environment sources
/// are skipped when they report an error.
pub(crate) fn mix<S: EntropySource>(source: &mut S, state_addr: usize) -> RngResult<SeedMaterial> {
    let mut seed = Zeroizing::new([0u8; 64]);
    let mut hash = Sha512::new();

    hash.update(state_addr.to_le_bytes());
    hash.update((seed.as_ptr() as usize).to_le_bytes());
    hash.update(source.rdtsc().to_le_bytes());

    if let Err(e) = source.sysrand(&mut seed[..OS_BYTES]) {
        warn!("OS entropy unavailable, refusing to seed: {e}");
        wipe(&mut hash);
        return Err(e.into());
    }
    absorb(&mut hash, source, &seed[..OS_BYTES]);
    debug!("mixed {OS_BYTES} bytes of OS entropy");

    match source.hwrand(&mut seed[..HW_BYTES]) {
        Ok(()) => {
            absorb(&mut hash, source, &seed[..HW_BYTES]);
            debug!("mixed {HW_BYTES} bytes of hardware entropy");
        }
        Err(e) => debug!("skipping hardware entropy: {e}"),
    }

    match source.envrand(&mut seed) {
        Ok(()) => {
            absorb(&mut hash, source, &seed[..ENV_BYTES]);
            debug!("mixed {ENV_BYTES} bytes of environment entropy");
        }
        Err(e) => debug!("skipping environment entropy: {e}"),
    }

    hash.finalize_into_reset(GenericArray::from_mut_slice(&mut seed[..]));
    wipe(&mut hash);

    let mut reduced = hchacha::<U10>(
        chacha20::Key::from_slice(&seed[..32]),
        GenericArray::from_slice(&seed[32..48]),
    );

    let mut material = SeedMaterial {
        key: [0u8; 32],
        zero: le_u64(&seed[48..56]),
        nonce: le_u64(&seed[56..64]),
    };
    material.key.copy_from_slice(&reduced);
    reduced.as_mut_slice().zeroize();

    Ok(material)
}

fn absorb<S: EntropySource>(hash: &mut Sha512, source: &S, chunk: &[u8]) {
    hash.update(chunk);
    hash.update(source.rdtsc().to_le_bytes());
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(bytes);
    u64::from_le_bytes(word)
}

fn wipe(hash: &mut Sha512) {
    // SAFETY: the SHA-512 context is plain integer arrays and counters with
    // no pointers or drop glue, and all-zero is a valid value for each.
    unsafe { zeroize::zeroize_flat_type(hash) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sodalite_entropy::{EntropyError, EntropyResult};

    /// Deterministic source that records which probes were consulted.
    #[derive(Default)]
    struct ScriptedSource {
        fail_os: bool,
        hardware: bool,
        environment: bool,
        calls: Vec<&'static str>,
    }

    impl EntropySource for ScriptedSource {
        fn sysrand(&mut self, dst: &mut [u8]) -> EntropyResult<()> {
            self.calls.push("sysrand");
            if self.fail_os {
                return Err(EntropyError::Os("scripted failure".into()));
            }
            dst.fill(0x11);
            Ok(())
        }

        fn hwrand(&mut self, dst: &mut [u8]) -> EntropyResult<()> {
            self.calls.push("hwrand");
            if !self.hardware {
                return Err(EntropyError::Unavailable("hardware"));
            }
            dst.fill(0x22);
            Ok(())
        }

        fn envrand(&mut self, dst: &mut [u8; 64]) -> EntropyResult<()> {
            self.calls.push("envrand");
            if !self.environment {
                return Err(EntropyError::Disabled("environment"));
            }
            dst.fill(0x33);
            Ok(())
        }

        fn has_rdrand(&self) -> bool {
            false
        }

        fn rdrand(&mut self) -> u32 {
            0
        }

        fn rdtsc(&self) -> u64 {
            0
        }
    }

    #[test]
    fn os_failure_aborts_before_optional_sources() {
        let mut source = ScriptedSource {
            fail_os: true,
            hardware: true,
            environment: true,
            ..Default::default()
        };

        assert!(mix(&mut source, 0).is_err());
        assert_eq!(source.calls, vec!["sysrand"]);
    }

    #[test]
    fn optional_sources_are_best_effort() {
        let mut source = ScriptedSource::default();

        assert!(mix(&mut source, 0).is_ok());
        assert_eq!(source.calls, vec!["sysrand", "hwrand", "envrand"]);
    }

    #[test]
    fn every_source_changes_the_seed() {
        let mut os_only = ScriptedSource::default();
        let mut with_hw = ScriptedSource {
            hardware: true,
            ..Default::default()
        };
        let mut with_env = ScriptedSource {
            environment: true,
            ..Default::default()
        };

        let a = mix(&mut os_only, 0).unwrap();
        let b = mix(&mut with_hw, 0).unwrap();
        let c = mix(&mut with_env, 0).unwrap();

        assert_ne!(a.key, b.key);
        assert_ne!(a.key, c.key);
        assert_ne!(b.key, c.key);
    }

    #[test]
    fn state_address_is_mixed_in() {
        let a = mix(&mut ScriptedSource::default(), 0x1000).unwrap();
        let b = mix(&mut ScriptedSource::default(), 0x2000).unwrap();
        assert_ne!(a.key, b.key);
    }

    #[test]
    fn digest_is_split_into_state() {
        let material = mix(&mut ScriptedSource::default(), 0).unwrap();
        assert!(material.key.iter().any(|&b| b != 0));
        assert_ne!(material.zero, material.nonce);
    }
}
