//! Hardware entropy and cycle counters.
//!
//! RDRAND and RDSEED are never trusted on their own. Their output is only
//! hashed next to the OS pool during seeding, and at most 32 bits of it are
//! folded into the key per draw. On non-x86 targets the hardware source
//! reports itself unavailable and the cycle counter falls back to a
//! nanosecond clock.

use crate::error::{EntropyError, EntropyResult};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, truncated to 64 bits.
pub(crate) fn hrtime() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod cpu {
    #[cfg(target_arch = "x86")]
    use std::arch::x86 as arch;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64 as arch;

    const RDRAND_RETRIES: usize = 10;
    const RDSEED_RETRIES: usize = 1024;

    pub(crate) fn has_rdrand() -> bool {
        std::arch::is_x86_feature_detected!("rdrand")
    }

    pub(crate) fn has_rdseed() -> bool {
        std::arch::is_x86_feature_detected!("rdseed")
    }

    pub(crate) fn rdtsc() -> u64 {
        // SAFETY: RDTSC is available on every x86 CPU Rust targets.
        unsafe { arch::_rdtsc() }
    }

    /// One RDRAND word, or `None` if the DRBG stayed empty for every retry.
    pub(crate) fn rdrand32() -> Option<u32> {
        if !has_rdrand() {
            return None;
        }
        // SAFETY: CPUID reported RDRAND support.
        unsafe { rdrand32_step() }
    }

    /// One RDSEED word, or `None` if the conditioner never delivered.
    pub(crate) fn rdseed32() -> Option<u32> {
        if !has_rdseed() {
            return None;
        }
        // SAFETY: CPUID reported RDSEED support.
        unsafe { rdseed32_step() }
    }

    #[target_feature(enable = "rdrand")]
    unsafe fn rdrand32_step() -> Option<u32> {
        let mut x = 0u32;
        for _ in 0..RDRAND_RETRIES {
            if arch::_rdrand32_step(&mut x) == 1 {
                return Some(x);
            }
        }
        None
    }

    #[target_feature(enable = "rdseed")]
    unsafe fn rdseed32_step() -> Option<u32> {
        let mut x = 0u32;
        for _ in 0..RDSEED_RETRIES {
            if arch::_rdseed32_step(&mut x) == 1 {
                return Some(x);
            }
            std::hint::spin_loop();
        }
        None
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
mod cpu {
    pub(crate) fn has_rdrand() -> bool {
        false
    }

    pub(crate) fn has_rdseed() -> bool {
        false
    }

    pub(crate) fn rdtsc() -> u64 {
        super::hrtime()
    }

    pub(crate) fn rdrand32() -> Option<u32> {
        None
    }

    pub(crate) fn rdseed32() -> Option<u32> {
        None
    }
}

/// RDRAND outputs XOR-folded into each 64-bit word when RDSEED is missing.
/// Draining this many values forces the on-chip DRBG to reseed at least once.
const RDRAND_FOLD: usize = 1024;

pub(crate) use cpu::{has_rdrand, rdtsc};

/// A single RDRAND word; zero when the instruction is missing or failed.
pub(crate) fn rdrand() -> u32 {
    cpu::rdrand32().unwrap_or(0)
}

/// Fills `dst` from RDSEED, or from folded RDRAND output without it.
pub(crate) fn hwrand(dst: &mut [u8]) -> EntropyResult<()> {
    let rdseed = cpu::has_rdseed();

    if !rdseed && !cpu::has_rdrand() {
        return Err(EntropyError::Unavailable("hardware"));
    }

    for chunk in dst.chunks_mut(8) {
        let word = if rdseed {
            rdseed64()?
        } else {
            fold_words(cpu::rdrand32)?
        };
        chunk.copy_from_slice(&word.to_le_bytes()[..chunk.len()]);
    }

    Ok(())
}

fn rdseed64() -> EntropyResult<u64> {
    match (cpu::rdseed32(), cpu::rdseed32()) {
        (Some(lo), Some(hi)) => Ok((u64::from(hi) << 32) | u64::from(lo)),
        _ => Err(EntropyError::Unavailable("hardware")),
    }
}

/// XOR-folds `RDRAND_FOLD` pairs of words from `next` into one 64-bit word.
///
/// Failed reads contribute nothing. Fails only if no read succeeded.
fn fold_words(mut next: impl FnMut() -> Option<u32>) -> EntropyResult<u64> {
    let mut acc = 0u64;
    let mut delivered = false;

    for _ in 0..RDRAND_FOLD {
        for shift in [32, 0] {
            if let Some(x) = next() {
                acc ^= u64::from(x) << shift;
                delivered = true;
            }
        }
    }

    if delivered {
        Ok(acc)
    } else {
        Err(EntropyError::Unavailable("hardware"))
    }
}
