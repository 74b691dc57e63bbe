//! Default entropy backend for the running platform.

use crate::config::EntropyConfig;
use crate::error::{EntropyError, EntropyResult};
use crate::{env, hw, os, EntropySource};
use tracing::debug;

/// OS pool plus the hardware and environment sources allowed by an
/// [`EntropyConfig`].
#[derive(Clone, Debug, Default)]
pub struct SystemEntropy {
    config: EntropyConfig,
}

impl SystemEntropy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EntropyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EntropyConfig {
        &self.config
    }
}

impl EntropySource for SystemEntropy {
    fn sysrand(&mut self, dst: &mut [u8]) -> EntropyResult<()> {
        os::sysrand(dst)
    }

    fn hwrand(&mut self, dst: &mut [u8]) -> EntropyResult<()> {
        if !self.config.hardware {
            return Err(EntropyError::Disabled("hardware"));
        }
        hw::hwrand(dst)
    }

    fn envrand(&mut self, dst: &mut [u8; 64]) -> EntropyResult<()> {
        if !self.config.environment {
            return Err(EntropyError::Disabled("environment"));
        }
        env::envrand(dst)
    }

    fn has_rdrand(&self) -> bool {
        let available = self.config.mix_hardware_per_draw && hw::has_rdrand();
        debug!("per-draw RDRAND mixing available: {available}");
        available
    }

    fn rdrand(&mut self) -> u32 {
        hw::rdrand()
    }

    fn rdtsc(&self) -> u64 {
        hw::rdtsc()
    }
}
