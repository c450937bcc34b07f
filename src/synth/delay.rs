//! Stereo feedback delay.

use super::config::MAX_DELAY_SECONDS;
use super::filter::{HighPassFilter, LowPassFilter, OnePoleConfig};
use super::params::DelayUnit;
use super::tier::{AudioState, EventConfig};

/// Feedback at or below this magnitude is flushed to zero.
pub const FEEDBACK_THRESHOLD: f32 = 1.0 / 8192.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayConfig {
    /// Delay in samples, at least one. Channels clamp it to their buffer.
    pub length: usize,
    pub feedback: f32,
    pub cross: bool,
    pub mix: f32,
    pub high_cut: OnePoleConfig,
    pub low_cut: OnePoleConfig,
}

impl DelayConfig {
    pub fn new(unit: &dyn DelayUnit, sample_rate: f64) -> Self {
        let length = (unit.delay().max(0.0) * sample_rate / 1000.0) as usize;
        Self {
            length: length.max(1),
            feedback: unit.feedback().clamp(-1.0, 1.0),
            cross: unit.cross(),
            mix: unit.mix().clamp(0.0, 1.0),
            high_cut: OnePoleConfig::new(unit.high_cut(), sample_rate),
            low_cut: OnePoleConfig::new(unit.low_cut(), sample_rate),
        }
    }
}

impl EventConfig for DelayConfig {}

/// Filter history of one channel, kept apart from its buffer.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelFilters {
    high_cut: LowPassFilter,
    low_cut: HighPassFilter,
}

impl AudioState for ChannelFilters {}

#[derive(Debug, Clone)]
pub struct DelayChannel {
    buffer: Vec<f32>,
    cursor: usize,
    filters: ChannelFilters,
    feedback: f32,
}

impl DelayChannel {
    /// Allocates a buffer holding `MAX_DELAY_SECONDS` of audio.
    pub fn new(sample_rate: f64) -> Self {
        let size = ((sample_rate * MAX_DELAY_SECONDS) as usize).max(1);
        Self {
            buffer: vec![0.0; size],
            cursor: 0,
            filters: ChannelFilters::default(),
            feedback: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Output of the previous sample times the feedback amount.
    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.cursor = 0;
        self.filters.reset();
        self.feedback = 0.0;
    }

    #[inline]
    pub fn tick(&mut self, config: &DelayConfig, input: f32) -> f32 {
        let length = config.length.clamp(1, self.buffer.len());
        if self.cursor >= length {
            self.cursor = 0;
        }

        let delayed = self.buffer[self.cursor];
        self.buffer[self.cursor] = input;
        self.cursor += 1;
        if self.cursor == length {
            self.cursor = 0;
        }

        let output = self.filters.high_cut.tick(&config.high_cut, delayed);
        let output = self.filters.low_cut.tick(&config.low_cut, output);

        self.feedback = output * config.feedback;
        if self.feedback.abs() <= FEEDBACK_THRESHOLD {
            self.feedback = 0.0;
        }
        output
    }
}

#[derive(Debug, Clone)]
pub struct Delay {
    left: DelayChannel,
    right: DelayChannel,
}

impl Delay {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            left: DelayChannel::new(sample_rate),
            right: DelayChannel::new(sample_rate),
        }
    }

    pub fn clear(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    /// Returns the wet signal only.
    #[inline]
    pub fn tick(&mut self, config: &DelayConfig, left: f32, right: f32) -> (f32, f32) {
        let mut left_input = left + self.left.feedback();
        let mut right_input = right + self.right.feedback();
        if config.cross {
            std::mem::swap(&mut left_input, &mut right_input);
        }
        (
            self.left.tick(config, left_input),
            self.right.tick(config, right_input),
        )
    }

    /// Dry/wet crossfade by `config.mix`. The lines keep running at zero mix so raising it
    /// later never replays old audio.
    #[inline]
    pub fn mix(&mut self, config: &DelayConfig, left: f32, right: f32) -> (f32, f32) {
        let (wet_left, wet_right) = self.tick(config, left, right);
        if config.mix <= 0.0 {
            return (left, right);
        }
        let dry = 1.0 - config.mix;
        (
            left * dry + wet_left * config.mix,
            right * dry + wet_right * config.mix,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::DelayPatch;

    const SAMPLE_RATE: f64 = 44_100.0;

    fn config(delay_ms: f64, feedback: f32, cross: bool) -> DelayConfig {
        DelayConfig::new(
            &DelayPatch {
                mix: 1.0,
                delay: delay_ms,
                feedback,
                cross,
                low_cut: 0.0,
                high_cut: 135.0,
            },
            SAMPLE_RATE,
        )
    }

    #[test]
    fn impulse_arrives_after_the_delay() {
        let config = config(10.0, 0.0, false);
        let length = config.length;
        assert_eq!(length, 441);

        let mut delay = Delay::new(SAMPLE_RATE);
        let out: Vec<f32> = (0..length + 20)
            .map(|i| delay.tick(&config, if i == 0 { 1.0 } else { 0.0 }, 0.0).0)
            .collect();
        assert!(out[..length].iter().all(|v| v.abs() < 1e-6));
        assert!(out[length..].iter().any(|v| v.abs() > 0.1));
    }

    #[test]
    fn feedback_dies_to_exact_zero() {
        let config = config(5.0, 0.5, false);
        let mut delay = Delay::new(SAMPLE_RATE);
        delay.tick(&config, 1.0, 1.0);
        let mut silent_at = None;
        for i in 0..SAMPLE_RATE as usize {
            delay.tick(&config, 0.0, 0.0);
            if delay.left.feedback() == 0.0 && delay.right.feedback() == 0.0 && i > config.length {
                silent_at.get_or_insert(i);
            }
        }
        assert!(silent_at.is_some());
        assert_eq!(delay.left.feedback(), 0.0);
    }

    #[test]
    fn cross_moves_feedback_to_the_other_side() {
        let config = config(1.0, 0.9, true);
        let length = config.length;
        let mut delay = Delay::new(SAMPLE_RATE);
        delay.tick(&config, 1.0, 0.0);
        let mut right_peak = 0.0f32;
        for _ in 0..length * 3 {
            let (_, r) = delay.tick(&config, 0.0, 0.0);
            right_peak = right_peak.max(r.abs());
        }
        assert!(right_peak > 0.1);
    }

    #[test]
    fn long_delays_are_clamped_to_the_buffer() {
        let config = config(10_000.0, 0.0, false);
        let mut channel = DelayChannel::new(SAMPLE_RATE);
        assert_eq!(channel.capacity(), 22_050);
        for _ in 0..channel.capacity() * 2 {
            assert!(channel.tick(&config, 0.0).is_finite());
        }
    }

    #[test]
    fn zero_mix_is_dry() {
        let mut config = config(10.0, 0.5, false);
        config.mix = 0.0;
        let mut delay = Delay::new(SAMPLE_RATE);
        assert_eq!(delay.mix(&config, 0.3, -0.2), (0.3, -0.2));
    }

    #[test]
    fn raising_mix_does_not_replay_old_audio() {
        let wet = config(10.0, 0.0, false);
        let mut muted = wet;
        muted.mix = 0.0;
        let mut delay = Delay::new(SAMPLE_RATE);

        delay.mix(&wet, 1.0, 1.0);
        for _ in 0..100 {
            delay.mix(&wet, 0.0, 0.0);
        }
        for _ in 0..2 * wet.length {
            assert_eq!(delay.mix(&muted, 0.0, 0.0), (0.0, 0.0));
        }

        let peak = (0..2 * wet.length)
            .map(|_| delay.mix(&wet, 0.0, 0.0).0.abs())
            .fold(0.0f32, f32::max);
        assert!(peak < 0.05, "stale echo {peak}");
    }
}
