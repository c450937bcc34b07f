use core::f64::consts::TAU;

use super::math::{pitch_to_freq, sin};
use super::tier::{AudioState, EventConfig};

/// Highest resonance a filter will accept; the state-variable loop rings forever at 1.
pub const MAX_RESONANCE: f32 = 0.98;

// --- One-pole ---

/// Smoothing coefficient of a one-pole filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnePoleConfig {
    alpha: f32,
}

impl OnePoleConfig {
    /// `cutoff` is a pitch in semitones; the frequency is capped at Nyquist.
    pub fn new(cutoff: f64, sample_rate: f64) -> Self {
        let rc = 1.0 / (TAU * (sample_rate / 2.0).min(pitch_to_freq(cutoff)));
        let dt = 1.0 / sample_rate;
        Self {
            alpha: (dt / (rc + dt)).clamp(0.0, 1.0) as f32,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl EventConfig for OnePoleConfig {}

#[derive(Debug, Clone, Copy, Default)]
pub struct LowPassFilter {
    smoothed: f32,
}

impl LowPassFilter {
    #[inline]
    pub fn tick(&mut self, config: &OnePoleConfig, input: f32) -> f32 {
        self.smoothed += config.alpha * (input - self.smoothed);
        self.smoothed
    }
}

impl AudioState for LowPassFilter {}

/// Input minus its own low-passed copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighPassFilter {
    smoothed: f32,
}

impl HighPassFilter {
    #[inline]
    pub fn tick(&mut self, config: &OnePoleConfig, input: f32) -> f32 {
        self.smoothed += config.alpha * (input - self.smoothed);
        input - self.smoothed
    }
}

impl AudioState for HighPassFilter {}

// --- Resonant low-pass ---

/// Coefficients of the state-variable low-pass.
///
/// The cutoff follows the playing key and a modulation offset, so `retune` may run once per
/// sample. It only does arithmetic on this value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResonantConfig {
    cutoff: f64,
    resonance: f32,
    sample_rate: f64,
    alpha: f32,
    damping: f32,
}

impl ResonantConfig {
    /// `cutoff` is in semitones relative to the key pitch passed to [`Self::retune`].
    pub fn new(cutoff: f64, resonance: f32, sample_rate: f64) -> Self {
        let mut config = Self {
            cutoff,
            resonance,
            sample_rate,
            alpha: 0.0,
            damping: 1.0,
        };
        config.retune(0.0, 0.0, 0.0);
        config
    }

    /// Recomputes alpha and damping for a key pitch plus modulation offsets.
    #[inline]
    pub fn retune(&mut self, key_pitch: f64, cutoff_offset: f64, resonance_offset: f32) {
        let freq = pitch_to_freq(self.cutoff + key_pitch + cutoff_offset);
        let half_turn = (freq / self.sample_rate / 2.0).clamp(0.0, 0.25) as f32;
        self.alpha = (2.0 * sin(half_turn)).clamp(0.0, 1.0);
        let resonance = (self.resonance + resonance_offset).clamp(0.0, MAX_RESONANCE);
        self.damping = 1.0 - resonance;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }
}

impl EventConfig for ResonantConfig {}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResonantLowPass {
    low: f32,
    band: f32,
}

impl ResonantLowPass {
    #[inline]
    pub fn tick(&mut self, config: &ResonantConfig, input: f32) -> f32 {
        self.low += config.alpha * self.band;
        let high = input - self.low - config.damping * self.band;
        self.band += config.alpha * high;
        self.low
    }
}

impl AudioState for ResonantLowPass {}
