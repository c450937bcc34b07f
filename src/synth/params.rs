//! Read-only parameter views consumed by the engine, and [`Patch`], a plain in-memory
//! implementation of all of them.
//!
//! Hosts with their own parameter storage implement the unit traits directly; the engine
//! only ever reads through them.

use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::config::{KEY_COUNT, MAX_STACK_COUNT, MIDI_CHANNELS};
use super::modulation::Destination;
use crate::error::Result;

// --- Unit traits ---

/// ADSR settings. Times are 0-80 steps from 1 ms to 10 s.
pub trait EnvelopeUnit {
    fn attack(&self) -> i32;
    fn decay(&self) -> i32;
    fn sustain(&self) -> f32;
    fn release(&self) -> i32;
}

pub trait CarrierUnit: EnvelopeUnit {
    /// Frequency ratio relative to the voice pitch.
    fn pitch(&self) -> f64;
    /// Start phase in cycles.
    fn phase(&self) -> f64;
    fn sync(&self) -> bool;
    fn level(&self) -> f32;
    fn shape_x(&self) -> f32;
    fn shape_y(&self) -> f32;
    fn pan(&self) -> f32;
}

pub trait ModulatorUnit: EnvelopeUnit {
    fn pitch(&self) -> f64;
    fn phase(&self) -> f64;
    fn sync(&self) -> bool;
    /// FM depth in cycles of carrier phase.
    fn level(&self) -> f32;
    fn feedback(&self) -> f64;
    fn shape_x(&self) -> f32;
    fn shape_y(&self) -> f32;
}

pub trait FilterUnit {
    fn mix(&self) -> f32;
    /// Semitones above the playing key.
    fn cutoff(&self) -> f64;
    fn resonance(&self) -> f32;
}

pub trait DelayUnit {
    fn mix(&self) -> f32;
    /// Delay time in milliseconds.
    fn delay(&self) -> f64;
    fn feedback(&self) -> f32;
    fn cross(&self) -> bool;
    /// High-pass cutoff as a pitch.
    fn low_cut(&self) -> f64;
    /// Low-pass cutoff as a pitch.
    fn high_cut(&self) -> f64;
}

pub trait LfoUnit {
    fn level(&self) -> f32;
    /// Rate in Hz.
    fn speed(&self) -> f64;
    fn shape_x(&self) -> f32;
    fn shape_y(&self) -> f32;
}

pub trait ModulationEnvelopeUnit: EnvelopeUnit {
    fn level(&self) -> f32;
}

/// Depth of each modulation source for one destination.
pub trait ModulationSourceUnit {
    fn lfo(&self) -> f64;
    fn envelope(&self) -> f64;
    fn wheel(&self) -> f64;
    fn velocity(&self) -> f64;
    fn pressure(&self) -> f64;
}

pub trait ModulationUnit {
    fn lfo(&self) -> &dyn LfoUnit;
    fn envelope(&self) -> &dyn ModulationEnvelopeUnit;
    fn destination(&self, destination: Destination) -> &dyn ModulationSourceUnit;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackMode {
    #[default]
    Unison,
    Harmonic,
}

pub trait InputUnit {
    /// Pitch-bend range in semitones.
    fn bend(&self) -> f64;
    /// Negative: polyphonic. Zero: mono. Positive: mono with glide, in centiseconds.
    fn glide(&self) -> i32;
    fn octave(&self) -> i32;
    fn stack(&self) -> usize;
    fn stack_mode(&self) -> StackMode;
    /// Unison spread; the outermost copy of a seven-voice stack sits at
    /// `detune * 36 / 40` cents.
    fn stack_detune(&self) -> i32;
    fn stack_stereo(&self) -> f32;
}

/// `(n / d) ^ (pn / pd)`, an interval given as a rational raised to a rational power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub n: i32,
    pub d: i32,
    pub pn: i32,
    pub pd: i32,
}

impl Rational {
    pub const UNISON: Self = Self::new(1, 1, 1, 1);
    pub const OCTAVE: Self = Self::new(2, 1, 1, 1);
    pub const SEMITONE: Self = Self::new(2, 1, 1, 12);

    pub const fn new(n: i32, d: i32, pn: i32, pd: i32) -> Self {
        Self { n, d, pn, pd }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::UNISON
    }
}

pub trait ChannelTuningUnit {
    fn offset(&self) -> i32;
    fn ratio(&self) -> Rational;
    fn generator(&self) -> Rational;
    fn period(&self) -> Rational;
}

pub trait TuningUnit {
    /// Key that sounds at its own pitch plus the ratio.
    fn root(&self) -> i32;
    /// Keys per period.
    fn key_period(&self) -> i32;
    /// Tuning of MIDI channel `index` (0-15).
    fn channel(&self, index: usize) -> &dyn ChannelTuningUnit;
}

/// Everything the processor reads from its host.
pub trait SynthModel {
    fn master(&self) -> f32;
    /// Bend wheel position in `[-1, 1]`.
    fn pitch_bend(&self) -> f64;
    fn wheel(&self) -> f64;
    /// Channel pressure in `[0, 1]`.
    fn after_touch(&self) -> f32;
    fn input(&self) -> &dyn InputUnit;
    fn a1(&self) -> &dyn CarrierUnit;
    fn a2(&self) -> &dyn ModulatorUnit;
    fn b1(&self) -> &dyn CarrierUnit;
    fn b2(&self) -> &dyn ModulatorUnit;
    fn filter(&self) -> &dyn FilterUnit;
    fn delay(&self) -> &dyn DelayUnit;
    fn modulation(&self) -> &dyn ModulationUnit;
    fn tuning(&self) -> &dyn TuningUnit;
}

// --- Patch ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPatch {
    pub bend: f64,
    pub glide: i32,
    pub octave: i32,
    pub stack: usize,
    pub stack_mode: StackMode,
    pub stack_detune: i32,
    pub stack_stereo: f32,
}

impl Default for InputPatch {
    fn default() -> Self {
        Self {
            bend: 2.0,
            glide: -1,
            octave: 0,
            stack: 1,
            stack_mode: StackMode::Unison,
            stack_detune: 10,
            stack_stereo: 0.0,
        }
    }
}

impl InputUnit for InputPatch {
    fn bend(&self) -> f64 {
        self.bend
    }
    fn glide(&self) -> i32 {
        self.glide
    }
    fn octave(&self) -> i32 {
        self.octave
    }
    fn stack(&self) -> usize {
        self.stack
    }
    fn stack_mode(&self) -> StackMode {
        self.stack_mode
    }
    fn stack_detune(&self) -> i32 {
        self.stack_detune
    }
    fn stack_stereo(&self) -> f32 {
        self.stack_stereo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarrierPatch {
    pub pitch: f64,
    pub phase: f64,
    pub sync: bool,
    pub level: f32,
    pub shape_x: f32,
    pub shape_y: f32,
    pub pan: f32,
    pub attack: i32,
    pub decay: i32,
    pub sustain: f32,
    pub release: i32,
}

impl Default for CarrierPatch {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            phase: 0.0,
            sync: false,
            level: 1.0,
            shape_x: 0.0,
            shape_y: 0.0,
            pan: 0.0,
            attack: 0,
            decay: 40,
            sustain: 1.0,
            release: 40,
        }
    }
}

impl EnvelopeUnit for CarrierPatch {
    fn attack(&self) -> i32 {
        self.attack
    }
    fn decay(&self) -> i32 {
        self.decay
    }
    fn sustain(&self) -> f32 {
        self.sustain
    }
    fn release(&self) -> i32 {
        self.release
    }
}

impl CarrierUnit for CarrierPatch {
    fn pitch(&self) -> f64 {
        self.pitch
    }
    fn phase(&self) -> f64 {
        self.phase
    }
    fn sync(&self) -> bool {
        self.sync
    }
    fn level(&self) -> f32 {
        self.level
    }
    fn shape_x(&self) -> f32 {
        self.shape_x
    }
    fn shape_y(&self) -> f32 {
        self.shape_y
    }
    fn pan(&self) -> f32 {
        self.pan
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulatorPatch {
    pub pitch: f64,
    pub phase: f64,
    pub sync: bool,
    pub level: f32,
    pub feedback: f64,
    pub shape_x: f32,
    pub shape_y: f32,
    pub attack: i32,
    pub decay: i32,
    pub sustain: f32,
    pub release: i32,
}

impl Default for ModulatorPatch {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            phase: 0.0,
            sync: false,
            level: 0.0,
            feedback: 0.0,
            shape_x: 0.0,
            shape_y: 0.0,
            attack: 0,
            decay: 40,
            sustain: 1.0,
            release: 40,
        }
    }
}

impl EnvelopeUnit for ModulatorPatch {
    fn attack(&self) -> i32 {
        self.attack
    }
    fn decay(&self) -> i32 {
        self.decay
    }
    fn sustain(&self) -> f32 {
        self.sustain
    }
    fn release(&self) -> i32 {
        self.release
    }
}

impl ModulatorUnit for ModulatorPatch {
    fn pitch(&self) -> f64 {
        self.pitch
    }
    fn phase(&self) -> f64 {
        self.phase
    }
    fn sync(&self) -> bool {
        self.sync
    }
    fn level(&self) -> f32 {
        self.level
    }
    fn feedback(&self) -> f64 {
        self.feedback
    }
    fn shape_x(&self) -> f32 {
        self.shape_x
    }
    fn shape_y(&self) -> f32 {
        self.shape_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPatch {
    pub mix: f32,
    pub cutoff: f64,
    pub resonance: f32,
}

impl Default for FilterPatch {
    fn default() -> Self {
        Self {
            mix: 0.0,
            cutoff: 36.0,
            resonance: 0.5,
        }
    }
}

impl FilterUnit for FilterPatch {
    fn mix(&self) -> f32 {
        self.mix
    }
    fn cutoff(&self) -> f64 {
        self.cutoff
    }
    fn resonance(&self) -> f32 {
        self.resonance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayPatch {
    pub mix: f32,
    pub delay: f64,
    pub feedback: f32,
    pub cross: bool,
    pub low_cut: f64,
    pub high_cut: f64,
}

impl Default for DelayPatch {
    fn default() -> Self {
        Self {
            mix: 0.0,
            delay: 250.0,
            feedback: 0.5,
            cross: false,
            low_cut: 50.0,
            high_cut: 90.0,
        }
    }
}

impl DelayUnit for DelayPatch {
    fn mix(&self) -> f32 {
        self.mix
    }
    fn delay(&self) -> f64 {
        self.delay
    }
    fn feedback(&self) -> f32 {
        self.feedback
    }
    fn cross(&self) -> bool {
        self.cross
    }
    fn low_cut(&self) -> f64 {
        self.low_cut
    }
    fn high_cut(&self) -> f64 {
        self.high_cut
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfoPatch {
    pub level: f32,
    pub speed: f64,
    pub shape_x: f32,
    pub shape_y: f32,
}

impl Default for LfoPatch {
    fn default() -> Self {
        Self {
            level: 1.0,
            speed: 4.0,
            shape_x: 0.0,
            shape_y: 0.0,
        }
    }
}

impl LfoUnit for LfoPatch {
    fn level(&self) -> f32 {
        self.level
    }
    fn speed(&self) -> f64 {
        self.speed
    }
    fn shape_x(&self) -> f32 {
        self.shape_x
    }
    fn shape_y(&self) -> f32 {
        self.shape_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationEnvelopePatch {
    pub level: f32,
    pub attack: i32,
    pub decay: i32,
    pub sustain: f32,
    pub release: i32,
}

impl Default for ModulationEnvelopePatch {
    fn default() -> Self {
        Self {
            level: 1.0,
            attack: 20,
            decay: 50,
            sustain: 0.0,
            release: 40,
        }
    }
}

impl EnvelopeUnit for ModulationEnvelopePatch {
    fn attack(&self) -> i32 {
        self.attack
    }
    fn decay(&self) -> i32 {
        self.decay
    }
    fn sustain(&self) -> f32 {
        self.sustain
    }
    fn release(&self) -> i32 {
        self.release
    }
}

impl ModulationEnvelopeUnit for ModulationEnvelopePatch {
    fn level(&self) -> f32 {
        self.level
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePatch {
    pub lfo: f64,
    pub envelope: f64,
    pub wheel: f64,
    pub velocity: f64,
    pub pressure: f64,
}

impl ModulationSourceUnit for SourcePatch {
    fn lfo(&self) -> f64 {
        self.lfo
    }
    fn envelope(&self) -> f64 {
        self.envelope
    }
    fn wheel(&self) -> f64 {
        self.wheel
    }
    fn velocity(&self) -> f64 {
        self.velocity
    }
    fn pressure(&self) -> f64 {
        self.pressure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulationPatch {
    pub lfo: LfoPatch,
    pub envelope: ModulationEnvelopePatch,
    pub lfo_speed: SourcePatch,
    pub lfo_level: SourcePatch,
    pub a_pitch: SourcePatch,
    pub a_pan: SourcePatch,
    pub a1_level: SourcePatch,
    pub a2_level: SourcePatch,
    pub b_pitch: SourcePatch,
    pub b_pan: SourcePatch,
    pub b1_level: SourcePatch,
    pub b2_level: SourcePatch,
    pub filter_cutoff: SourcePatch,
    pub filter_resonance: SourcePatch,
    pub filter_mix: SourcePatch,
}

impl ModulationPatch {
    pub fn destination_mut(&mut self, destination: Destination) -> &mut SourcePatch {
        match destination {
            Destination::LfoSpeed => &mut self.lfo_speed,
            Destination::LfoLevel => &mut self.lfo_level,
            Destination::APitch => &mut self.a_pitch,
            Destination::APan => &mut self.a_pan,
            Destination::A1Level => &mut self.a1_level,
            Destination::A2Level => &mut self.a2_level,
            Destination::BPitch => &mut self.b_pitch,
            Destination::BPan => &mut self.b_pan,
            Destination::B1Level => &mut self.b1_level,
            Destination::B2Level => &mut self.b2_level,
            Destination::FilterCutoff => &mut self.filter_cutoff,
            Destination::FilterResonance => &mut self.filter_resonance,
            Destination::FilterMix => &mut self.filter_mix,
        }
    }
}

impl ModulationUnit for ModulationPatch {
    fn lfo(&self) -> &dyn LfoUnit {
        &self.lfo
    }
    fn envelope(&self) -> &dyn ModulationEnvelopeUnit {
        &self.envelope
    }
    fn destination(&self, destination: Destination) -> &dyn ModulationSourceUnit {
        match destination {
            Destination::LfoSpeed => &self.lfo_speed,
            Destination::LfoLevel => &self.lfo_level,
            Destination::APitch => &self.a_pitch,
            Destination::APan => &self.a_pan,
            Destination::A1Level => &self.a1_level,
            Destination::A2Level => &self.a2_level,
            Destination::BPitch => &self.b_pitch,
            Destination::BPan => &self.b_pan,
            Destination::B1Level => &self.b1_level,
            Destination::B2Level => &self.b2_level,
            Destination::FilterCutoff => &self.filter_cutoff,
            Destination::FilterResonance => &self.filter_resonance,
            Destination::FilterMix => &self.filter_mix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelTuningPatch {
    pub offset: i32,
    pub ratio: Rational,
    pub generator: Rational,
    pub period: Rational,
}

impl Default for ChannelTuningPatch {
    fn default() -> Self {
        Self {
            offset: 0,
            ratio: Rational::UNISON,
            generator: Rational::SEMITONE,
            period: Rational::OCTAVE,
        }
    }
}

impl ChannelTuningUnit for ChannelTuningPatch {
    fn offset(&self) -> i32 {
        self.offset
    }
    fn ratio(&self) -> Rational {
        self.ratio
    }
    fn generator(&self) -> Rational {
        self.generator
    }
    fn period(&self) -> Rational {
        self.period
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningPatch {
    pub root: i32,
    pub key_period: i32,
    pub channels: [ChannelTuningPatch; MIDI_CHANNELS],
}

impl Default for TuningPatch {
    fn default() -> Self {
        Self {
            root: 69,
            key_period: 12,
            channels: [ChannelTuningPatch::default(); MIDI_CHANNELS],
        }
    }
}

impl TuningUnit for TuningPatch {
    fn root(&self) -> i32 {
        self.root
    }
    fn key_period(&self) -> i32 {
        self.key_period
    }
    fn channel(&self, index: usize) -> &dyn ChannelTuningUnit {
        &self.channels[index % MIDI_CHANNELS]
    }
}

/// A complete parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patch {
    pub master: f32,
    pub pitch_bend: f64,
    pub wheel: f64,
    pub after_touch: f32,
    pub input: InputPatch,
    pub a1: CarrierPatch,
    pub a2: ModulatorPatch,
    pub b1: CarrierPatch,
    pub b2: ModulatorPatch,
    pub filter: FilterPatch,
    pub delay: DelayPatch,
    pub modulation: ModulationPatch,
    pub tuning: TuningPatch,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON patch. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let patch: Self = serde_json::from_str(json)?;
        if !(1..=MAX_STACK_COUNT).contains(&patch.input.stack) {
            warn!(
                "Stack of {} will be clamped to 1..={}",
                patch.input.stack, MAX_STACK_COUNT
            );
        }
        if !(1..=KEY_COUNT as i32).contains(&patch.tuning.key_period) {
            warn!(
                "Key period {} will be clamped to 1..={}",
                patch.tuning.key_period, KEY_COUNT
            );
        }
        debug!(
            "Loaded patch: stack {} ({:?}), glide {}",
            patch.input.stack, patch.input.stack_mode, patch.input.glide
        );
        Ok(patch)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            master: 0.75,
            pitch_bend: 0.0,
            wheel: 0.0,
            after_touch: 0.0,
            input: InputPatch::default(),
            a1: CarrierPatch::default(),
            a2: ModulatorPatch::default(),
            b1: CarrierPatch {
                level: 0.0,
                ..CarrierPatch::default()
            },
            b2: ModulatorPatch::default(),
            filter: FilterPatch::default(),
            delay: DelayPatch::default(),
            modulation: ModulationPatch::default(),
            tuning: TuningPatch::default(),
        }
    }
}

impl SynthModel for Patch {
    fn master(&self) -> f32 {
        self.master
    }
    fn pitch_bend(&self) -> f64 {
        self.pitch_bend
    }
    fn wheel(&self) -> f64 {
        self.wheel
    }
    fn after_touch(&self) -> f32 {
        self.after_touch
    }
    fn input(&self) -> &dyn InputUnit {
        &self.input
    }
    fn a1(&self) -> &dyn CarrierUnit {
        &self.a1
    }
    fn a2(&self) -> &dyn ModulatorUnit {
        &self.a2
    }
    fn b1(&self) -> &dyn CarrierUnit {
        &self.b1
    }
    fn b2(&self) -> &dyn ModulatorUnit {
        &self.b2
    }
    fn filter(&self) -> &dyn FilterUnit {
        &self.filter
    }
    fn delay(&self) -> &dyn DelayUnit {
        &self.delay
    }
    fn modulation(&self) -> &dyn ModulationUnit {
        &self.modulation
    }
    fn tuning(&self) -> &dyn TuningUnit {
        &self.tuning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let patch = Patch::from_json(
            r#"{ "master": 0.5, "input": { "stack": 3, "stack_mode": "harmonic" },
                 "tuning": { "key_period": 19 } }"#,
        )
        .unwrap();
        assert_eq!(patch.master, 0.5);
        assert_eq!(patch.input.stack, 3);
        assert_eq!(patch.input.stack_mode, StackMode::Harmonic);
        assert_eq!(patch.input.glide, -1);
        assert_eq!(patch.tuning.key_period, 19);
        assert_eq!(patch.tuning.root, 69);
        assert_eq!(patch.a1, CarrierPatch::default());
    }

    #[test]
    fn malformed_json_is_a_patch_error() {
        let err = Patch::from_json("{ \"master\": \"loud\" }").unwrap_err();
        assert!(matches!(err, crate::Error::Patch(_)));
    }

    #[test]
    fn destinations_map_to_their_fields() {
        let mut patch = Patch::default();
        patch.modulation.destination_mut(Destination::BPan).lfo = 0.25;
        assert_eq!(patch.modulation.b_pan.lfo, 0.25);
        assert_eq!(patch.modulation().destination(Destination::BPan).lfo(), 0.25);
        assert_eq!(patch.modulation().destination(Destination::APan).lfo(), 0.0);
    }
}
