//! Per-voice modulation: one LFO and one envelope routed, together with the mod wheel,
//! velocity and pressure, to a fixed set of destinations.

use super::envelope::{Envelope, EnvelopeConfig};
use super::lfo::{LfoConfig, LfoWave};
use super::params::{ModulationSourceUnit, SynthModel};
use super::tier::{AudioState, EventConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    LfoSpeed,
    LfoLevel,
    APitch,
    APan,
    A1Level,
    A2Level,
    BPitch,
    BPan,
    B1Level,
    B2Level,
    FilterCutoff,
    FilterResonance,
    FilterMix,
}

impl Destination {
    pub const COUNT: usize = 13;

    pub const ALL: [Destination; Self::COUNT] = [
        Destination::LfoSpeed,
        Destination::LfoLevel,
        Destination::APitch,
        Destination::APan,
        Destination::A1Level,
        Destination::A2Level,
        Destination::BPitch,
        Destination::BPan,
        Destination::B1Level,
        Destination::B2Level,
        Destination::FilterCutoff,
        Destination::FilterResonance,
        Destination::FilterMix,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Depths of the five sources for one destination.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceDepths {
    pub lfo: f64,
    pub envelope: f64,
    pub wheel: f64,
    pub velocity: f64,
    pub pressure: f64,
    /// `wheel` times the current wheel position.
    pub wheel_value: f64,
    pub active: bool,
}

impl SourceDepths {
    pub fn new(unit: &dyn ModulationSourceUnit, wheel: f64) -> Self {
        let (lfo, envelope, wheel_depth, velocity, pressure) = (
            unit.lfo(),
            unit.envelope(),
            unit.wheel(),
            unit.velocity(),
            unit.pressure(),
        );
        Self {
            lfo,
            envelope,
            wheel: wheel_depth,
            velocity,
            pressure,
            wheel_value: wheel * wheel_depth,
            active: lfo != 0.0
                || envelope != 0.0
                || wheel_depth != 0.0
                || velocity != 0.0
                || pressure != 0.0,
        }
    }
}

/// Current source values of one voice, refreshed once per sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sources {
    pub lfo: f32,
    pub envelope: f32,
    pub velocity: f32,
    pub pressure: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationConfig {
    destinations: [SourceDepths; Destination::COUNT],
    pub lfo: LfoConfig,
    pub envelope: EnvelopeConfig,
    pub envelope_level: f32,
    /// False when the envelope level is zero or no destination uses it.
    pub envelope_active: bool,
}

impl ModulationConfig {
    pub fn new(model: &dyn SynthModel, sample_rate: f64) -> Self {
        let unit = model.modulation();
        let wheel = model.wheel();
        let destinations =
            Destination::ALL.map(|d| SourceDepths::new(unit.destination(d), wheel));

        let lfo_routed = destinations.iter().any(|d| d.lfo != 0.0);
        let envelope_routed = destinations.iter().any(|d| d.envelope != 0.0);
        let envelope_level = unit.envelope().level().max(0.0);

        Self {
            destinations,
            lfo: LfoConfig::new(unit.lfo(), lfo_routed, sample_rate),
            envelope: EnvelopeConfig::from_unit(unit.envelope(), sample_rate),
            envelope_level,
            envelope_active: envelope_level > 0.0 && envelope_routed,
        }
    }

    pub fn depths(&self, destination: Destination) -> &SourceDepths {
        &self.destinations[destination.index()]
    }

    pub fn is_active(&self, destination: Destination) -> bool {
        self.depths(destination).active
    }

    /// Sum of every source times its depth. Zero when the destination is unused.
    #[inline]
    pub fn add(&self, destination: Destination, sources: &Sources) -> f64 {
        let d = self.depths(destination);
        if !d.active {
            return 0.0;
        }
        sources.lfo as f64 * d.lfo
            + sources.envelope as f64 * d.envelope
            + d.wheel_value
            + sources.pressure as f64 * d.pressure
            + sources.velocity as f64 * d.velocity
    }

    /// Gain factor. A depth of zero leaves a source's term at 1; full depth lets the source
    /// replace the base gain entirely.
    #[inline]
    pub fn multiply(&self, destination: Destination, sources: &Sources) -> f64 {
        let d = self.depths(destination);
        if !d.active {
            return 1.0;
        }
        let lfo_level = self.lfo.level as f64;
        let envelope_level = self.envelope_level as f64;
        ((1.0 - d.lfo * lfo_level).min(1.0) + (sources.lfo as f64 + 1.0) * 0.5 * d.lfo)
            * ((1.0 - d.envelope * envelope_level).min(1.0) + sources.envelope as f64 * d.envelope)
            * ((1.0 - d.wheel).min(1.0) + d.wheel_value)
            * ((1.0 - d.pressure).min(1.0) + sources.pressure as f64 * d.pressure)
            * ((1.0 - d.velocity).min(1.0) + sources.velocity as f64 * d.velocity)
    }

    /// Frequency factor. Sources compound rather than add; each factor stops at zero.
    #[inline]
    pub fn pitch(&self, destination: Destination, sources: &Sources) -> f64 {
        let d = self.depths(destination);
        if !d.active {
            return 1.0;
        }
        let factor = |x: f64| (1.0 + x).max(0.0);
        factor(sources.lfo as f64 * d.lfo)
            * factor(sources.envelope as f64 * d.envelope)
            * factor(d.wheel_value)
            * factor(sources.pressure as f64 * d.pressure)
            * factor(sources.velocity as f64 * d.velocity)
    }
}

impl EventConfig for ModulationConfig {}

#[derive(Debug, Clone, Copy, Default)]
pub struct Modulation {
    lfo: LfoWave,
    envelope: Envelope,
    sources: Sources,
}

impl Modulation {
    pub fn start(&mut self) {
        self.reset();
    }

    pub fn restart(&mut self) {
        self.envelope.restart();
    }

    pub fn sources(&self) -> &Sources {
        &self.sources
    }

    /// Advances the LFO and envelope one sample. The LFO's own speed and level follow the
    /// previous sample's sources.
    #[inline]
    pub fn tick(
        &mut self,
        config: &ModulationConfig,
        note_on: bool,
        velocity: f32,
        pressure: f32,
    ) -> Sources {
        let speed = config.pitch(Destination::LfoSpeed, &self.sources);
        let level = config.multiply(Destination::LfoLevel, &self.sources);
        self.sources = Sources {
            lfo: self.lfo.tick(&config.lfo, speed, level),
            envelope: if config.envelope_active {
                self.envelope.tick(&config.envelope, note_on) * config.envelope_level
            } else {
                0.0
            },
            velocity,
            pressure,
        };
        self.sources
    }
}

impl AudioState for Modulation {}
