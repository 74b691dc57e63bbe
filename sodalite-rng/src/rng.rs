//! ChaCha20 generator core.
//!
//! Each draw encrypts zeros under `(key, nonce, zero)`, then bumps the
//! nonce and replaces the key with itself XORed against the next keystream.
//! Recovering the current key therefore reveals nothing about earlier
//! output.

use crate::error::RngResult;
use crate::seed;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sodalite_entropy::{EntropyConfig, EntropySource, SystemEntropy};
use std::fmt;
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

const POOL_SIZE: usize = 64;
const POOL_WORDS: usize = POOL_SIZE / 4;
const WORDS_PER_BLOCK: u128 = 16;

#[derive(Zeroize)]
struct State {
    key: [u8; 32],
    zero: u64,
    nonce: u64,
}

/// A seeded, forward-secure CSPRNG.
///
/// The generator is owned by one caller and is not `Clone`. It must be
/// re-seeded after `fork()`: the child otherwise replays the parent's
/// stream. Use [`is_forked`](Self::is_forked) and [`reseed`](Self::reseed)
/// where that can happen.
pub struct Rng<S: EntropySource = SystemEntropy> {
    state: State,
    pool: [u8; POOL_SIZE],
    pos: usize,
    rdrand: bool,
    pid: u32,
    source: S,
}

impl Rng<SystemEntropy> {
    /// Seeds a generator from every source available on this platform.
    pub fn new() -> RngResult<Self> {
        Self::from_source(SystemEntropy::new())
    }

    /// Seeds a generator from the platform sources `config` allows.
    pub fn with_config(config: EntropyConfig) -> RngResult<Self> {
        Self::from_source(SystemEntropy::with_config(config))
    }
}

impl<S: EntropySource> Rng<S> {
    /// Seeds a generator from a caller-supplied entropy backend.
    ///
    /// Fails only when the backend's OS source fails.
    pub fn from_source(source: S) -> RngResult<Self> {
        let mut rng = Self {
            state: State {
                key: [0u8; 32],
                zero: 0,
                nonce: 0,
            },
            pool: [0u8; POOL_SIZE],
            pos: 0,
            rdrand: false,
            pid: 0,
            source,
        };
        rng.seed()?;
        Ok(rng)
    }

    /// Re-runs seeding on this generator.
    ///
    /// On error the generator is dropped, so stale state is never left
    /// usable.
    pub fn reseed(mut self) -> RngResult<Self> {
        self.seed()?;
        Ok(self)
    }

    /// Whether the process id differs from the one recorded at seeding.
    pub fn is_forked(&self) -> bool {
        self.pid != std::process::id()
    }

    /// The entropy backend this generator was seeded from.
    pub fn source(&self) -> &S {
        &self.source
    }

    fn seed(&mut self) -> RngResult<()> {
        let addr = &self.state as *const State as usize;
        let material = seed::mix(&mut self.source, addr)?;

        self.state.key = material.key;
        self.state.zero = material.zero;
        self.state.nonce = material.nonce;
        self.pool.zeroize();
        self.pos = 0;
        self.rdrand = self.source.has_rdrand();
        self.pid = std::process::id();

        debug!("rng seeded (per-draw hardware mixing: {})", self.rdrand);
        Ok(())
    }

    /// Fills `dst` with random bytes and rekeys.
    pub fn generate(&mut self, dst: &mut [u8]) {
        dst.fill(0);
        apply_keystream(&self.state.key, self.state.nonce, self.state.zero, dst);

        xor_word(&mut self.state.key, 0, dst.len() as u32);

        if self.rdrand {
            let hw = self.source.rdrand();
            xor_word(&mut self.state.key, 7, hw);
        }

        self.state.nonce = self.state.nonce.wrapping_add(1);

        let key = Zeroizing::new(self.state.key);
        apply_keystream(&key, self.state.nonce, self.state.zero, &mut self.state.key);
    }

    /// Returns one uniformly random 32-bit word.
    pub fn random(&mut self) -> u32 {
        if self.pos % POOL_WORDS == 0 {
            let mut pool = Zeroizing::new([0u8; POOL_SIZE]);
            self.generate(&mut pool[..]);
            self.pool = *pool;
            self.pos = 0;
        }

        let at = self.pos * 4;
        self.pos += 1;

        let mut word = [0u8; 4];
        word.copy_from_slice(&self.pool[at..at + 4]);
        u32::from_le_bytes(word)
    }

    /// Returns a uniformly random value in `[0, max)`, or 0 when `max <= 1`.
    ///
    /// Uses rejection sampling, so there is no modulo bias.
    pub fn uniform(&mut self, max: u32) -> u32 {
        if max <= 1 {
            return 0;
        }

        loop {
            let x = self.random();
            let r = x % max;

            if x.wrapping_sub(r) <= max.wrapping_neg() {
                return r;
            }
        }
    }
}

/// XORs the DJB ChaCha20 keystream for `(key, nonce)` starting at block
/// `counter` into `data`.
///
/// The 64-bit block counter wraps.
fn apply_keystream(key: &[u8; 32], nonce: u64, counter: u64, data: &mut [u8]) {
    if data.is_empty() {
        return;
    }

    let mut cipher = ChaCha20Rng::from_seed(*key);
    cipher.set_stream(nonce);
    cipher.set_word_pos(u128::from(counter) * WORDS_PER_BLOCK);

    let mut block = Zeroizing::new([0u8; 64]);
    for chunk in data.chunks_mut(64) {
        let ks = &mut block[..chunk.len()];
        cipher.fill_bytes(ks);
        chunk.iter_mut().zip(ks.iter()).for_each(|(d, k)| *d ^= k);
    }

    // SAFETY: ChaCha20Rng is a block buffer of integers plus the ChaCha
    // state words; it holds no pointers and has no Drop impl, and all-zero
    // is a valid value for every field.
    unsafe { zeroize::zeroize_flat_type(&mut cipher) }
}

fn xor_word(key: &mut [u8; 32], index: usize, value: u32) {
    let at = index * 4;
    let mut word = [0u8; 4];
    word.copy_from_slice(&key[at..at + 4]);
    let mixed = u32::from_le_bytes(word) ^ value;
    key[at..at + 4].copy_from_slice(&mixed.to_le_bytes());
}

impl<S: EntropySource> Drop for Rng<S> {
    fn drop(&mut self) {
        self.state.zeroize();
        self.pool.zeroize();
        self.pos = 0;
    }
}

impl<S: EntropySource> fmt::Debug for Rng<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rng")
            .field("state", &"[REDACTED]")
            .field("rdrand", &self.rdrand)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl<S: EntropySource> RngCore for Rng<S> {
    fn next_u32(&mut self) -> u32 {
        self.random()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.random());
        let hi = u64::from(self.random());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.generate(dst);
    }
}

impl<S: EntropySource> CryptoRng for Rng<S> {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Never consulted: `from_parts` skips seeding.
    struct Inert;

    impl EntropySource for Inert {
        fn sysrand(&mut self, _: &mut [u8]) -> sodalite_entropy::EntropyResult<()> {
            unreachable!()
        }
        fn hwrand(&mut self, _: &mut [u8]) -> sodalite_entropy::EntropyResult<()> {
            unreachable!()
        }
        fn envrand(&mut self, _: &mut [u8; 64]) -> sodalite_entropy::EntropyResult<()> {
            unreachable!()
        }
        fn has_rdrand(&self) -> bool {
            false
        }
        fn rdrand(&mut self) -> u32 {
            unreachable!()
        }
        fn rdtsc(&self) -> u64 {
            0
        }
    }

    /// Hands out one fixed hardware word per draw.
    struct HwWord(u32);

    impl EntropySource for HwWord {
        fn sysrand(&mut self, _: &mut [u8]) -> sodalite_entropy::EntropyResult<()> {
            unreachable!()
        }
        fn hwrand(&mut self, _: &mut [u8]) -> sodalite_entropy::EntropyResult<()> {
            unreachable!()
        }
        fn envrand(&mut self, _: &mut [u8; 64]) -> sodalite_entropy::EntropyResult<()> {
            unreachable!()
        }
        fn has_rdrand(&self) -> bool {
            true
        }
        fn rdrand(&mut self) -> u32 {
            self.0
        }
        fn rdtsc(&self) -> u64 {
            0
        }
    }

    impl<S: EntropySource> Rng<S> {
        fn from_parts_with(source: S, key: [u8; 32], zero: u64, nonce: u64) -> Self {
            Self {
                state: State { key, zero, nonce },
                pool: [0u8; POOL_SIZE],
                pos: 0,
                rdrand: source.has_rdrand(),
                pid: std::process::id(),
                source,
            }
        }
    }

    impl Rng<Inert> {
        fn from_parts(key: [u8; 32], zero: u64, nonce: u64) -> Self {
            Self::from_parts_with(Inert, key, zero, nonce)
        }
    }

    fn fixture() -> Rng<Inert> {
        Rng::from_parts([0x42; 32], 7, 5)
    }

    // ── Keystream ────────────────────────────────────────────────

    #[test]
    fn keystream_matches_djb_chacha20() {
        let mut buf = [0u8; 64];
        apply_keystream(&[0u8; 32], 0, 0, &mut buf);
        assert_eq!(
            hex::encode(buf),
            "76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7\
             da41597c5157488d7724e03fb8d84a376a43b8f41518a11cc387b669b2ee6586"
        );
    }

    #[test]
    fn keystream_counter_wraps_to_zero() {
        let key = [9u8; 32];

        let mut across = [0u8; 128];
        apply_keystream(&key, 3, u64::MAX, &mut across);

        let mut first = [0u8; 64];
        apply_keystream(&key, 3, 0, &mut first);

        assert_eq!(&across[64..], &first[..]);
        assert_ne!(&across[..64], &first[..]);
    }

    // ── Draws ────────────────────────────────────────────────────

    #[test]
    fn generate_known_answer() {
        let mut rng = fixture();

        let mut first = [0u8; 32];
        rng.generate(&mut first);
        assert_eq!(
            hex::encode(first),
            "ccfe2a236fabfb0f2fccf85dc82163c104637c1e815b3c079c398dbdacc9eb85"
        );

        let mut second = [0u8; 32];
        rng.generate(&mut second);
        assert_eq!(
            hex::encode(second),
            "5910dbde49c461baf9ba79d0e070ed231979b64c1e26bcc9b229c5d9c9bdfdc2"
        );
    }

    #[test]
    fn rekey_replaces_key_and_bumps_nonce() {
        let mut rng = fixture();
        let mut buf = [0u8; 32];
        rng.generate(&mut buf);
        rng.generate(&mut buf);

        assert_eq!(
            hex::encode(rng.state.key),
            "d031f30ed09db07ad76bd15878affd15632425d13f88856cbe95d75b3c417be7"
        );
        assert_eq!(rng.state.nonce, 7);
        assert_eq!(rng.state.zero, 7);
    }

    #[test]
    fn empty_generate_still_rekeys() {
        let mut rng = fixture();
        rng.generate(&mut []);

        let mut buf = [0u8; 16];
        rng.generate(&mut buf);
        assert_eq!(hex::encode(buf), "c37beeb737d7ddb327b127ac137b31f7");
    }

    #[test]
    fn random_reads_pool_little_endian() {
        let mut rng = fixture();
        assert_eq!(rng.random(), 0x232a_fecc);
        assert_eq!(rng.random(), 0x0ffb_ab6f);
        assert_eq!(rng.random(), 0x5df8_cc2f);
    }

    #[test]
    fn random_refills_after_sixteen_words() {
        let mut rng = fixture();
        for _ in 0..16 {
            rng.random();
        }
        assert_eq!(rng.pos, 16);
        assert_eq!(rng.state.nonce, 6);

        rng.random();
        assert_eq!(rng.pos, 1);
        assert_eq!(rng.state.nonce, 7);
    }

    #[test]
    fn hardware_word_changes_following_draw() {
        let mut plain = fixture();
        let mut mixed = Rng::from_parts_with(HwWord(0xdead_beef), [0x42; 32], 7, 5);

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        plain.generate(&mut a);
        mixed.generate(&mut b);
        // The word is folded into the key after output.
        assert_eq!(a, b);

        plain.generate(&mut a);
        mixed.generate(&mut b);
        assert_ne!(a, b);
        assert_ne!(plain.state.key, mixed.state.key);
    }

    #[test]
    fn zero_hardware_word_leaves_stream_unchanged() {
        let mut plain = fixture();
        let mut mixed = Rng::from_parts_with(HwWord(0), [0x42; 32], 7, 5);

        for _ in 0..3 {
            let mut a = [0u8; 32];
            let mut b = [0u8; 32];
            plain.generate(&mut a);
            mixed.generate(&mut b);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn nonce_wraps() {
        let mut rng = Rng::from_parts([1u8; 32], 0, u64::MAX);
        rng.generate(&mut [0u8; 8]);
        assert_eq!(rng.state.nonce, 0);
    }

    #[test]
    fn xor_word_touches_one_word() {
        let mut key = [0u8; 32];
        xor_word(&mut key, 7, 0x0403_0201);
        assert_eq!(&key[28..], &[1, 2, 3, 4]);
        assert!(key[..28].iter().all(|&b| b == 0));
    }

    #[test]
    fn debug_redacts_state() {
        let rng = fixture();
        let shown = format!("{rng:?}");
        assert!(shown.contains("REDACTED"));
        assert!(!shown.contains("key"));
    }
}
