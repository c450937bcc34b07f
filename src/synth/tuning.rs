//! Generator/period tuning tables, one per MIDI channel.

use super::config::{KEY_COUNT, MIDI_CHANNELS};
use super::params::{ChannelTuningUnit, Rational, TuningUnit};

const FALLBACK_PERIOD: f64 = 12.0;

/// A rational interval with its value in semitones cached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningValue {
    rational: Rational,
    value: f64,
}

impl TuningValue {
    pub fn new(rational: Rational) -> Self {
        Self {
            rational,
            value: semitones(rational),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Stores `rational`, returning true if it differs from the cached one.
    pub fn update(&mut self, rational: Rational) -> bool {
        if self.rational == rational {
            return false;
        }
        *self = Self::new(rational);
        true
    }
}

/// `log2(n / d) * 12 * pn / pd`, or zero for an undefined interval.
pub fn semitones(r: Rational) -> f64 {
    if r.n <= 0 || r.d <= 0 || r.pd == 0 {
        return 0.0;
    }
    (r.n as f64 / r.d as f64).log2() * 12.0 * r.pn as f64 / r.pd as f64
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelTuning {
    root: i32,
    key_period: i32,
    offset: i32,
    ratio: TuningValue,
    generator: TuningValue,
    period: TuningValue,
    pitches: [f64; KEY_COUNT],
}

impl ChannelTuning {
    pub fn new(tuning: &dyn TuningUnit, unit: &dyn ChannelTuningUnit) -> Self {
        let mut channel = Self {
            root: tuning.root(),
            key_period: tuning.key_period(),
            offset: unit.offset(),
            ratio: TuningValue::new(unit.ratio()),
            generator: TuningValue::new(unit.generator()),
            period: TuningValue::new(unit.period()),
            pitches: [0.0; KEY_COUNT],
        };
        channel.rebuild();
        channel
    }

    /// Pitch of `key` in semitones. Keys outside 0-127 are clamped.
    #[inline]
    pub fn pitch(&self, key: i32) -> f64 {
        self.pitches[key.clamp(0, KEY_COUNT as i32 - 1) as usize]
    }

    pub fn pitches(&self) -> &[f64; KEY_COUNT] {
        &self.pitches
    }

    /// Rebuilds the table if any input changed. Returns whether it did.
    pub fn recalculate(&mut self, tuning: &dyn TuningUnit, unit: &dyn ChannelTuningUnit) -> bool {
        let mut changed = self.root != tuning.root()
            || self.key_period != tuning.key_period()
            || self.offset != unit.offset();
        // every value must be refreshed, so no short-circuit here
        changed |= self.ratio.update(unit.ratio());
        changed |= self.generator.update(unit.generator());
        changed |= self.period.update(unit.period());
        if !changed {
            return false;
        }

        self.root = tuning.root();
        self.key_period = tuning.key_period();
        self.offset = unit.offset();
        self.rebuild();
        true
    }

    fn rebuild(&mut self) {
        let key_period = self.key_period.clamp(1, KEY_COUNT as i32);
        let period = match self.period.value() {
            p if p.is_finite() && p > 0.0 => p,
            _ => FALLBACK_PERIOD,
        };
        let base = self.root as f64 + self.ratio.value();
        let generator = self.generator.value();

        let mut sorted = [0.0; KEY_COUNT];
        let scale = &mut sorted[..key_period as usize];
        for (i, pitch) in scale.iter_mut().enumerate() {
            let steps = (i as i32 - self.offset) as f64;
            *pitch = (generator * steps).rem_euclid(period) + base;
        }
        scale.sort_unstable_by(f64::total_cmp);

        for (key, pitch) in self.pitches.iter_mut().enumerate() {
            let relative = key as i32 - self.root;
            let count = relative.div_euclid(key_period);
            let index = relative.rem_euclid(key_period) as usize;
            *pitch = (period * count as f64 + scale[index]).clamp(0.0, KEY_COUNT as f64);
        }
    }
}

/// Tables for all MIDI channels.
#[derive(Debug, Clone)]
pub struct Tuning {
    channels: [ChannelTuning; MIDI_CHANNELS],
}

impl Tuning {
    pub fn new(unit: &dyn TuningUnit) -> Self {
        Self {
            channels: std::array::from_fn(|i| ChannelTuning::new(unit, unit.channel(i))),
        }
    }

    pub fn recalculate(&mut self, unit: &dyn TuningUnit) {
        for (i, channel) in self.channels.iter_mut().enumerate() {
            channel.recalculate(unit, unit.channel(i));
        }
    }

    pub fn channel(&self, channel: usize) -> &ChannelTuning {
        &self.channels[channel % MIDI_CHANNELS]
    }

    #[inline]
    pub fn pitch(&self, channel: i16, key: i16) -> f64 {
        let channel = (channel.max(0) as usize).min(MIDI_CHANNELS - 1);
        self.channels[channel].pitch(key as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::{ChannelTuningPatch, TuningPatch};

    #[test]
    fn rational_values() {
        assert_eq!(semitones(Rational::OCTAVE), 12.0);
        assert_eq!(semitones(Rational::SEMITONE), 1.0);
        assert_eq!(semitones(Rational::UNISON), 0.0);
        assert!((semitones(Rational::new(3, 2, 1, 1)) - 7.019_550_008_653_875).abs() < 1e-12);
        assert_eq!(semitones(Rational::new(0, 1, 1, 1)), 0.0);
        assert_eq!(semitones(Rational::new(2, 1, 1, 0)), 0.0);
    }

    #[test]
    fn update_reports_changes_only() {
        let mut value = TuningValue::new(Rational::OCTAVE);
        assert!(!value.update(Rational::OCTAVE));
        assert!(value.update(Rational::SEMITONE));
        assert_eq!(value.value(), 1.0);
    }

    #[test]
    fn recalculate_is_cached() {
        let mut patch = TuningPatch::default();
        let mut channel = ChannelTuning::new(&patch, &patch.channels[0]);
        assert!(!channel.recalculate(&patch, &patch.channels[0]));

        patch.channels[0].offset = 1;
        assert!(channel.recalculate(&patch, &patch.channels[0]));
        assert!(!channel.recalculate(&patch, &patch.channels[0]));
    }

    #[test]
    fn fifth_generator_gives_a_sorted_scale() {
        let patch = TuningPatch {
            root: 60,
            key_period: 7,
            ..TuningPatch::default()
        };
        let unit = ChannelTuningPatch {
            generator: Rational::new(3, 2, 1, 1),
            ..ChannelTuningPatch::default()
        };
        let channel = ChannelTuning::new(&patch, &unit);
        let octave = &channel.pitches()[60..=67];
        assert_eq!(octave[0], 60.0);
        assert!(octave.windows(2).all(|w| w[1] > w[0]));
        assert!((octave[7] - 72.0).abs() < 1e-9);
        assert!((channel.pitch(53) - 48.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_period_falls_back() {
        let patch = TuningPatch::default();
        let unit = ChannelTuningPatch {
            period: Rational::new(1, 2, 1, 1),
            ..ChannelTuningPatch::default()
        };
        let channel = ChannelTuning::new(&patch, &unit);
        for key in 0..128 {
            assert!((channel.pitch(key) - key as f64).abs() < 1e-9);
        }
    }
}
