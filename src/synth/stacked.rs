//! One audible voice: two stacked carrier/modulator oscillators, per-voice modulation and
//! an optional resonant filter.

use super::config::MAX_STACK_COUNT;
use super::envelope::Envelope;
use super::filter::{ResonantConfig, ResonantLowPass};
use super::math::pan_level;
use super::modulation::{Destination, Modulation, ModulationConfig, Sources};
use super::operator::{CarrierWave, ModulatorWave, ResetPulse};
use super::scheduler::MidiVoice;
use super::tier::AudioState;
use super::tuning::Tuning;
use super::voice::{SynthVoice, VoiceEvent, VoiceState};
use super::voice_config::{ConfigSet, OscillatorConfig, StackConfig};

/// Cutoff modulation range in semitones at a modulation value of 1.
const CUTOFF_MODULATION_RANGE: f64 = 64.0;

/// Per-sample modulation values for one oscillator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorModulation {
    pub pitch: f64,
    pub pan: f32,
    pub level: f32,
    pub fm_level: f32,
}

impl OscillatorModulation {
    pub const NONE: Self = Self {
        pitch: 1.0,
        pan: 0.0,
        level: 1.0,
        fm_level: 1.0,
    };

    #[inline]
    fn oscillator_a(config: &ModulationConfig, sources: &Sources) -> Self {
        Self {
            pitch: config.pitch(Destination::APitch, sources),
            pan: config.add(Destination::APan, sources) as f32,
            level: config.multiply(Destination::A1Level, sources) as f32,
            fm_level: config.multiply(Destination::A2Level, sources) as f32,
        }
    }

    #[inline]
    fn oscillator_b(config: &ModulationConfig, sources: &Sources) -> Self {
        Self {
            pitch: config.pitch(Destination::BPitch, sources),
            pan: config.add(Destination::BPan, sources) as f32,
            level: config.multiply(Destination::B1Level, sources) as f32,
            fm_level: config.multiply(Destination::B2Level, sources) as f32,
        }
    }
}

/// `MAX_STACK_COUNT` copies of a carrier/modulator pair sharing two envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackedOscillator {
    pulses: [ResetPulse; MAX_STACK_COUNT],
    carriers: [CarrierWave; MAX_STACK_COUNT],
    modulators: [ModulatorWave; MAX_STACK_COUNT],
    envelope1: Envelope,
    envelope2: Envelope,
}

impl StackedOscillator {
    pub fn start(&mut self, config: &OscillatorConfig, stack: &StackConfig) {
        for i in 0..stack.count {
            self.carriers[i].start(&config.carrier);
            self.modulators[i].start(&config.modulator);
            self.pulses[i].reset();
        }
        self.envelope2.reset();
    }

    pub fn restart(&mut self) {
        self.envelope1.restart();
        self.envelope2.restart();
    }

    /// Renders one stereo sample of the whole stack, plus the amplitude envelope level.
    #[inline]
    pub fn tick(
        &mut self,
        config: &OscillatorConfig,
        stack: &StackConfig,
        modulation: &OscillatorModulation,
        note_on: bool,
        delta: f64,
    ) -> (f32, f32, f32) {
        let level1 = self.envelope1.tick(&config.envelope1, note_on);
        let level2 = self.envelope2.tick(&config.envelope2, note_on);
        let amplitude = level1 * modulation.level;
        let fm_depth = level2 * modulation.fm_level;

        let mut left = 0.0;
        let mut right = 0.0;
        for i in 0..stack.count {
            let delta = delta * modulation.pitch * stack.pitches[i];
            let reset_phase = self.pulses[i].tick(delta);
            let fm = fm_depth * self.modulators[i].tick(&config.modulator, delta, reset_phase);
            let output = amplitude * self.carriers[i].tick(&config.carrier, delta, reset_phase, fm);

            let pan = (config.carrier.pan + stack.pans[i] + modulation.pan).clamp(-1.0, 1.0);
            let (pan_left, pan_right) = pan_level(pan);
            left += output * pan_left;
            right += output * pan_right;
        }
        (left, right, level1)
    }
}

impl AudioState for StackedOscillator {}

#[derive(Debug, Clone, Copy)]
pub struct StackedVoice {
    voice: SynthVoice,
    modulation: Modulation,
    oscillator_a: StackedOscillator,
    oscillator_b: StackedOscillator,
    left_filter: ResonantLowPass,
    right_filter: ResonantLowPass,
    filter: ResonantConfig,
    filter_pitch: f64,
    filter_generation: Option<u64>,
}

impl Default for StackedVoice {
    fn default() -> Self {
        Self {
            voice: SynthVoice::default(),
            modulation: Modulation::default(),
            oscillator_a: StackedOscillator::default(),
            oscillator_b: StackedOscillator::default(),
            left_filter: ResonantLowPass::default(),
            right_filter: ResonantLowPass::default(),
            filter: ResonantConfig::new(0.0, 0.0, 44_100.0),
            filter_pitch: 0.0,
            filter_generation: None,
        }
    }
}

impl StackedVoice {
    pub fn state(&self) -> VoiceState {
        self.voice.state
    }

    pub fn pitch(&self) -> f64 {
        self.voice.pitch
    }

    /// Renders one stereo sample for the note `midi` currently holds.
    #[inline]
    pub fn tick(
        &mut self,
        midi: &MidiVoice,
        config: &ConfigSet,
        tuning: &Tuning,
        after_touch: f32,
    ) -> (f32, f32) {
        let target = tuning.pitch(midi.note.channel, midi.note.pitch)
            + 12.0 * config.octave as f64
            + config.pitch_bend;

        match self.voice.tick(midi, &config.glide, target, after_touch, config.sample_rate) {
            VoiceEvent::StartNote => self.start(config),
            VoiceEvent::RestartNote => self.restart(),
            VoiceEvent::PitchChanged | VoiceEvent::None => {}
        }

        if self.voice.state == VoiceState::Inactive {
            return (0.0, 0.0);
        }

        let note_on = self.voice.state == VoiceState::Active;
        let sources = self.modulation.tick(
            &config.modulation,
            note_on,
            self.voice.velocity,
            self.voice.pressure,
        );

        let modulation_a = OscillatorModulation::oscillator_a(&config.modulation, &sources);
        let modulation_b = OscillatorModulation::oscillator_b(&config.modulation, &sources);
        let (left_a, right_a, level_a) = self.oscillator_a.tick(
            &config.osc_a,
            &config.stack,
            &modulation_a,
            note_on,
            self.voice.delta,
        );
        let (left_b, right_b, level_b) = self.oscillator_b.tick(
            &config.osc_b,
            &config.stack,
            &modulation_b,
            note_on,
            self.voice.delta,
        );

        if self.voice.state == VoiceState::Release && level_a == 0.0 && level_b == 0.0 {
            self.voice.state = VoiceState::Inactive;
            return (0.0, 0.0);
        }

        let count = config.stack.count as f32;
        let left = (left_a + left_b) / count;
        let right = (right_a + right_b) / count;

        let mix = (config.filter_mix as f64
            * config.modulation.multiply(Destination::FilterMix, &sources))
        .clamp(0.0, 1.0) as f32;
        if mix <= 0.0 {
            return (left, right);
        }

        self.retune_filter(config, &sources);
        let dry = 1.0 - mix;
        (
            left * dry + self.left_filter.tick(&self.filter, left) * mix,
            right * dry + self.right_filter.tick(&self.filter, right) * mix,
        )
    }

    fn start(&mut self, config: &ConfigSet) {
        self.oscillator_a.start(&config.osc_a, &config.stack);
        self.oscillator_b.start(&config.osc_b, &config.stack);
        self.modulation.start();
        self.left_filter.reset();
        self.right_filter.reset();
        self.filter_generation = None;
    }

    fn restart(&mut self) {
        self.oscillator_a.restart();
        self.oscillator_b.restart();
        self.modulation.restart();
    }

    /// The one per-sample config update: only coefficients are recomputed.
    #[inline]
    fn retune_filter(&mut self, config: &ConfigSet, sources: &Sources) {
        let modulation = &config.modulation;
        let modulated = modulation.is_active(Destination::FilterCutoff)
            || modulation.is_active(Destination::FilterResonance);
        if !modulated
            && self.filter_pitch == self.voice.pitch
            && self.filter_generation == Some(config.generation)
        {
            return;
        }

        self.filter = config.filter;
        self.filter.retune(
            self.voice.pitch,
            modulation.add(Destination::FilterCutoff, sources) * CUTOFF_MODULATION_RANGE,
            modulation.add(Destination::FilterResonance, sources) as f32,
        );
        self.filter_pitch = self.voice.pitch;
        self.filter_generation = Some(config.generation);
    }
}

impl AudioState for StackedVoice {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::note::MidiNote;
    use crate::synth::params::{Patch, StackMode};

    const SAMPLE_RATE: f64 = 44_100.0;

    fn setup(patch: &Patch) -> (ConfigSet, Tuning) {
        (ConfigSet::new(patch, SAMPLE_RATE), Tuning::new(&patch.tuning))
    }

    fn render(
        voice: &mut StackedVoice,
        midi: &mut MidiVoice,
        config: &ConfigSet,
        tuning: &Tuning,
        samples: usize,
    ) -> Vec<(f32, f32)> {
        (0..samples)
            .map(|_| {
                midi.length += 1;
                voice.tick(midi, config, tuning, 0.0)
            })
            .collect()
    }

    fn peak(out: &[(f32, f32)]) -> f32 {
        out.iter().fold(0.0f32, |p, &(l, r)| p.max(l.abs()).max(r.abs()))
    }

    #[test]
    fn default_patch_plays_at_unity() {
        let patch = Patch::default();
        let (config, tuning) = setup(&patch);
        let mut voice = StackedVoice::default();
        let mut midi = MidiVoice::new(MidiNote::on(0, 60, 0.8));
        let out = render(&mut voice, &mut midi, &config, &tuning, 4096);
        let p = peak(&out);
        assert!((0.99..=1.01).contains(&p), "peak {p}");
        assert_eq!(voice.state(), VoiceState::Active);
        assert_eq!(voice.pitch(), 60.0);
    }

    #[test]
    fn released_voice_goes_inactive() {
        let mut patch = Patch::default();
        patch.a1.release = 0;
        patch.b1.release = 0;
        let (config, tuning) = setup(&patch);
        let mut voice = StackedVoice::default();
        let mut midi = MidiVoice::new(MidiNote::on(0, 60, 0.8));
        render(&mut voice, &mut midi, &config, &tuning, 100);

        let mut off = MidiVoice::default();
        let out = render(&mut voice, &mut off, &config, &tuning, 1000);
        assert_eq!(voice.state(), VoiceState::Inactive);
        assert_eq!(*out.last().unwrap(), (0.0, 0.0));
    }

    #[test]
    fn stack_size_does_not_change_loudness() {
        let mut patch = Patch::default();
        patch.input.stack = 4;
        patch.input.stack_detune = 0;
        let (config, tuning) = setup(&patch);
        let mut voice = StackedVoice::default();
        let mut midi = MidiVoice::new(MidiNote::on(0, 60, 0.8));
        let p = peak(&render(&mut voice, &mut midi, &config, &tuning, 4096));
        assert!((0.99..=1.01).contains(&p), "peak {p}");
    }

    #[test]
    fn harmonic_stack_repeats_at_the_fundamental() {
        let mut patch = Patch::default();
        // 441 Hz at key 69, so one period is exactly 100 samples
        patch.a1.pitch = 441.0 / 440.0;
        let render_left = |patch: &Patch| -> Vec<f32> {
            let (config, tuning) = setup(patch);
            let mut voice = StackedVoice::default();
            let mut midi = MidiVoice::new(MidiNote::on(0, 69, 1.0));
            render(&mut voice, &mut midi, &config, &tuning, 4096)
                .into_iter()
                .map(|(l, _)| l)
                .collect()
        };
        let single = render_left(&patch);

        patch.input.stack = MAX_STACK_COUNT;
        patch.input.stack_mode = StackMode::Harmonic;
        let stacked = render_left(&patch);

        for n in 2000..3000 {
            assert!((stacked[n + 100] - stacked[n]).abs() < 1e-3, "sample {n}");
        }
        let p = stacked[2000..].iter().fold(0.0f32, |p, v| p.max(v.abs()));
        assert!(p > 0.1 && p <= 1.01, "peak {p}");
        let difference = (2000..3000)
            .map(|n| (stacked[n] - single[n]).abs())
            .fold(0.0f32, f32::max);
        assert!(difference > 0.05);
    }

    #[test]
    fn filter_darkens_a_bright_note() {
        let mut patch = Patch::default();
        patch.a1.shape_y = 1.0;
        let (config, tuning) = setup(&patch);
        let mut voice = StackedVoice::default();
        let mut midi = MidiVoice::new(MidiNote::on(0, 48, 1.0));
        let dry = peak(&render(&mut voice, &mut midi, &config, &tuning, 4096));

        patch.filter.mix = 1.0;
        patch.filter.cutoff = -24.0;
        patch.filter.resonance = 0.0;
        let (config, tuning) = setup(&patch);
        let mut voice = StackedVoice::default();
        let mut midi = MidiVoice::new(MidiNote::on(0, 48, 1.0));
        let filtered = peak(&render(&mut voice, &mut midi, &config, &tuning, 4096)[2048..]);
        assert!(filtered < dry * 0.5, "dry {dry} filtered {filtered}");
    }

    #[test]
    fn velocity_routed_to_level() {
        let mut patch = Patch::default();
        patch.modulation.a1_level.velocity = 1.0;
        let (config, tuning) = setup(&patch);
        let mut voice = StackedVoice::default();
        let mut midi = MidiVoice::new(MidiNote::on(0, 60, 0.5));
        let p = peak(&render(&mut voice, &mut midi, &config, &tuning, 4096));
        assert!((p - 0.5).abs() < 0.01, "peak {p}");
    }
}
