use super::config::MAX_STACK_COUNT;
use super::delay::DelayConfig;
use super::envelope::EnvelopeConfig;
use super::filter::ResonantConfig;
use super::glide::GlideConfig;
use super::modulation::ModulationConfig;
use super::operator::{CarrierConfig, ModulatorConfig};
use super::params::{CarrierUnit, InputUnit, ModulatorUnit, StackMode, SynthModel};
use super::tier::EventConfig;

// Unison detune per copy, in units of `detune / 48000` octaves.
const DETUNE_FACTORS: [[i32; MAX_STACK_COUNT]; MAX_STACK_COUNT + 1] = [
    [0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0],
    [-1, 1, 0, 0, 0, 0, 0],
    [0, -4, 4, 0, 0, 0, 0],
    [-1, 1, -9, 9, 0, 0, 0],
    [0, -4, 4, -16, 16, 0, 0],
    [-1, 1, -9, 9, -25, 25, 0],
    [0, -4, 4, -16, 16, 36, -36],
];

const PAN_FACTORS: [[i32; MAX_STACK_COUNT]; MAX_STACK_COUNT + 1] = [
    [0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0],
    [-1, 1, 0, 0, 0, 0, 0],
    [0, -2, 2, 0, 0, 0, 0],
    [-1, 1, 3, -3, 0, 0, 0],
    [0, -2, 2, 4, -4, 0, 0],
    [-1, 1, 3, -3, -5, 5, 0],
    [0, -2, 2, 4, -4, -6, 6],
];

/// Frequency ratio and pan offset of every copy in a unison or harmonic stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackConfig {
    pub mode: StackMode,
    /// Copies in use, `1..=MAX_STACK_COUNT`.
    pub count: usize,
    pub pitches: [f64; MAX_STACK_COUNT],
    pub pans: [f32; MAX_STACK_COUNT],
}

impl StackConfig {
    pub fn new(unit: &dyn InputUnit) -> Self {
        let count = unit.stack().clamp(1, MAX_STACK_COUNT);
        let mode = unit.stack_mode();
        let mut pitches = [1.0; MAX_STACK_COUNT];
        match mode {
            StackMode::Unison => {
                let detune = unit.stack_detune() as f64;
                for (pitch, &factor) in pitches.iter_mut().zip(&DETUNE_FACTORS[count]) {
                    *pitch = 2f64.powf(detune * factor as f64 / 48_000.0);
                }
            }
            StackMode::Harmonic => {
                for (i, pitch) in pitches.iter_mut().enumerate() {
                    *pitch = (i + 1) as f64;
                }
                pitches[MAX_STACK_COUNT - 1] = 8.0;
            }
        }

        let stereo = unit.stack_stereo();
        let mut pans = [0.0; MAX_STACK_COUNT];
        if stereo != 0.0 {
            for (pan, &factor) in pans.iter_mut().zip(&PAN_FACTORS[count]) {
                *pan = factor as f32 * stereo / count as f32;
            }
        }

        Self {
            mode,
            count,
            pitches,
            pans,
        }
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            mode: StackMode::Unison,
            count: 1,
            pitches: [1.0; MAX_STACK_COUNT],
            pans: [0.0; MAX_STACK_COUNT],
        }
    }
}

impl EventConfig for StackConfig {}

/// A carrier/modulator pair with its amplitude (`envelope1`) and FM depth (`envelope2`)
/// envelopes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorConfig {
    pub carrier: CarrierConfig,
    pub modulator: ModulatorConfig,
    pub envelope1: EnvelopeConfig,
    pub envelope2: EnvelopeConfig,
}

impl OscillatorConfig {
    pub fn new(carrier: &dyn CarrierUnit, modulator: &dyn ModulatorUnit, sample_rate: f64) -> Self {
        Self {
            carrier: CarrierConfig::new(carrier),
            modulator: ModulatorConfig::new(modulator),
            envelope1: EnvelopeConfig::from_unit(carrier, sample_rate),
            envelope2: EnvelopeConfig::from_unit(modulator, sample_rate),
        }
    }
}

impl EventConfig for OscillatorConfig {}

/// Every config a voice needs, rebuilt together from the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigSet {
    /// Bumped on every rebuild so voices can tell when cached coefficients went stale.
    pub generation: u64,
    pub sample_rate: f64,
    pub stack: StackConfig,
    pub glide: GlideConfig,
    pub filter: ResonantConfig,
    pub filter_mix: f32,
    pub osc_a: OscillatorConfig,
    pub osc_b: OscillatorConfig,
    pub modulation: ModulationConfig,
    pub delay: DelayConfig,
    pub master: f32,
    /// Bend wheel times bend range, in semitones.
    pub pitch_bend: f64,
    pub octave: i32,
}

impl ConfigSet {
    pub fn new(model: &dyn SynthModel, sample_rate: f64) -> Self {
        let input = model.input();
        let filter = model.filter();
        Self {
            generation: 0,
            sample_rate,
            stack: StackConfig::new(input),
            glide: GlideConfig::from_unit(input, sample_rate),
            filter: ResonantConfig::new(filter.cutoff(), filter.resonance(), sample_rate),
            filter_mix: filter.mix().clamp(0.0, 1.0),
            osc_a: OscillatorConfig::new(model.a1(), model.a2(), sample_rate),
            osc_b: OscillatorConfig::new(model.b1(), model.b2(), sample_rate),
            modulation: ModulationConfig::new(model, sample_rate),
            delay: DelayConfig::new(model.delay(), sample_rate),
            master: model.master(),
            pitch_bend: model.pitch_bend().clamp(-1.0, 1.0) * input.bend(),
            octave: input.octave(),
        }
    }

    pub fn recalculate(&mut self, model: &dyn SynthModel, sample_rate: f64) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::new(model, sample_rate)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::{InputPatch, Patch};

    #[test]
    fn unison_spreads_symmetrically() {
        let stack = StackConfig::new(&InputPatch {
            stack: 3,
            stack_detune: 100,
            ..InputPatch::default()
        });
        assert_eq!(stack.count, 3);
        assert_eq!(stack.pitches[0], 1.0);
        assert!((stack.pitches[1] * stack.pitches[2] - 1.0).abs() < 1e-12);
        assert!(stack.pitches[2] > 1.0);
        assert_eq!(stack.pans, [0.0; MAX_STACK_COUNT]);
    }

    #[test]
    fn harmonic_stack_tops_out_at_eight() {
        let stack = StackConfig::new(&InputPatch {
            stack: 7,
            stack_mode: StackMode::Harmonic,
            ..InputPatch::default()
        });
        assert_eq!(stack.pitches, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0]);
    }

    #[test]
    fn stereo_spread_and_clamped_count() {
        let stack = StackConfig::new(&InputPatch {
            stack: 12,
            stack_stereo: 1.0,
            ..InputPatch::default()
        });
        assert_eq!(stack.count, MAX_STACK_COUNT);
        assert!((stack.pans[5] + 6.0 / 7.0).abs() < 1e-6);
        assert!(stack.pans.iter().all(|p| p.abs() < 1.0));

        assert_eq!(StackConfig::new(&InputPatch { stack: 0, ..InputPatch::default() }).count, 1);
    }

    #[test]
    fn configs_compare_by_value() {
        let mut patch = Patch::default();
        let before = ConfigSet::new(&patch, 44_100.0);
        assert_eq!(before, ConfigSet::new(&patch, 44_100.0));

        patch.a2.level = 0.5;
        let after = ConfigSet::new(&patch, 44_100.0);
        assert_ne!(before, after);
        assert_eq!(before.osc_a.carrier, after.osc_a.carrier);
        assert_ne!(before.osc_a.modulator, after.osc_a.modulator);
        assert_eq!(before.osc_b, after.osc_b);
    }

    #[test]
    fn recalculate_bumps_generation() {
        let mut patch = Patch::default();
        let mut set = ConfigSet::new(&patch, 44_100.0);
        patch.master = 0.5;
        patch.pitch_bend = 1.0;
        set.recalculate(&patch, 44_100.0);
        assert_eq!(set.generation, 1);
        assert_eq!(set.master, 0.5);
        assert_eq!(set.pitch_bend, 2.0);
    }
}
