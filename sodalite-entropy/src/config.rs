//! Entropy source configuration.

use serde::{Deserialize, Serialize};

/// Selects which optional entropy sources the system backend consults.
///
/// The OS entropy pool is always required and cannot be switched off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    /// Read RDSEED/RDRAND output while seeding.
    pub hardware: bool,

    /// Hash process and environment state while seeding.
    pub environment: bool,

    /// XOR one 32-bit RDRAND word into the key on every draw.
    pub mix_hardware_per_draw: bool,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            hardware: true,
            environment: true,
            mix_hardware_per_draw: true,
        }
    }
}

impl EntropyConfig {
    /// Only the OS pool; no hardware or environment contributions.
    pub fn os_only() -> Self {
        Self {
            hardware: false,
            environment: false,
            mix_hardware_per_draw: false,
        }
    }
}
