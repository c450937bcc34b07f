use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// --- Compile-time bounds ---

/// Number of polyphonic voice slots.
pub const MAX_VOICES: usize = 8;
/// Largest unison/harmonic stack.
pub const MAX_STACK_COUNT: usize = 7;
/// Capacity of each pending-event ring (notes, poly pressure).
pub const MAX_RESERVATIONS: usize = 64;
pub const MIDI_CHANNELS: usize = 16;
pub const KEY_COUNT: usize = 128;
/// Length of each delay line, in seconds of audio.
pub const MAX_DELAY_SECONDS: f64 = 0.5;
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;
pub const DEFAULT_BUFFER_SIZE: usize = 512;

/// Settings that belong to the host rather than to a patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub sample_rate: f64,
    /// Largest block the host renders in one call; render buffers are sized from it.
    pub buffer_size: usize,
}

impl SynthConfig {
    pub fn new(sample_rate: f64, buffer_size: usize) -> Result<Self> {
        let config = Self {
            sample_rate,
            buffer_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(self.sample_rate)?;
        if self.buffer_size == 0 {
            return Err(Error::InvalidBufferSize(self.buffer_size));
        }
        Ok(())
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

pub fn validate_sample_rate(sample_rate: f64) -> Result<()> {
    if sample_rate.is_finite() && sample_rate >= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidSampleRate(sample_rate))
    }
}
