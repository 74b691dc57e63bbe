//! Process and environment derived entropy.
//!
//! None of these inputs is secret on its own. Hashed together they still
//! separate two processes that happen to receive identical OS output,
//! e.g. cloned VMs restored from the same snapshot.

use crate::error::EntropyResult;
use crate::hw;
use sha2::digest::generic_array::GenericArray;
use sha2::{Digest, Sha512};

/// Hashes process state, clocks and the environment into `dst`.
pub(crate) fn envrand(dst: &mut [u8; 64]) -> EntropyResult<()> {
    let mut hash = Sha512::new();

    hash.update(std::process::id().to_le_bytes());
    hash.update(format!("{:?}", std::thread::current().id()).as_bytes());
    hash.update(hw::hrtime().to_le_bytes());
    hash.update(hw::rdtsc().to_le_bytes());

    // Stack and heap addresses vary with ASLR.
    let marker = 0u8;
    let boxed = Box::new(0u8);
    hash.update((&marker as *const u8 as usize).to_le_bytes());
    hash.update((&*boxed as *const u8 as usize).to_le_bytes());

    for (key, value) in std::env::vars_os() {
        hash.update(key.as_encoded_bytes());
        hash.update([0]);
        hash.update(value.as_encoded_bytes());
        hash.update([0]);
    }

    for arg in std::env::args_os() {
        hash.update(arg.as_encoded_bytes());
        hash.update([0]);
    }

    if let Ok(dir) = std::env::current_dir() {
        hash.update(dir.as_os_str().as_encoded_bytes());
    }

    if let Ok(exe) = std::env::current_exe() {
        hash.update(exe.as_os_str().as_encoded_bytes());
    }

    hash.update(std::env::temp_dir().as_os_str().as_encoded_bytes());

    if let Ok(n) = std::thread::available_parallelism() {
        hash.update(n.get().to_le_bytes());
    }

    hash.update(hw::rdtsc().to_le_bytes());
    hash.finalize_into(GenericArray::from_mut_slice(&mut dst[..]));

    Ok(())
}
