use super::math::wrap;
use super::params::{CarrierUnit, ModulatorUnit};
use super::tier::{AudioState, EventConfig};
use super::waveform::{CarrierShape, MorphShape};

/// Phase accumulator at the voice fundamental that drives hard sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetPulse {
    phase: f64,
}

impl ResetPulse {
    /// Advances one sample. Returns the wrapped phase on the sample where the cycle restarts,
    /// otherwise `-1.0`.
    #[inline]
    pub fn tick(&mut self, delta: f64) -> f64 {
        self.phase += delta;
        let wraps = self.phase.floor();
        self.phase -= wraps;
        if wraps >= 1.0 {
            self.phase
        } else {
            -1.0
        }
    }
}

impl AudioState for ResetPulse {}

// --- Carrier ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierConfig {
    /// Frequency ratio relative to the voice.
    pub ratio: f64,
    /// Start phase in cycles.
    pub phase: f64,
    pub sync: bool,
    pub level: f32,
    pub pan: f32,
    pub shape: CarrierShape,
}

impl CarrierConfig {
    pub fn new(unit: &dyn CarrierUnit) -> Self {
        Self {
            ratio: unit.pitch().max(0.0),
            phase: wrap(unit.phase()),
            sync: unit.sync(),
            level: unit.level(),
            pan: unit.pan().clamp(-1.0, 1.0),
            shape: CarrierShape::new(unit.shape_x(), unit.shape_y()),
        }
    }
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            phase: 0.0,
            sync: false,
            level: 1.0,
            pan: 0.0,
            shape: CarrierShape::default(),
        }
    }
}

impl EventConfig for CarrierConfig {}

/// The audible operator. Frequency modulation is added to its phase before shaping.
#[derive(Debug, Clone, Copy, Default)]
pub struct CarrierWave {
    phase: f64,
}

impl CarrierWave {
    pub fn start(&mut self, config: &CarrierConfig) {
        self.phase = config.phase;
    }

    /// Renders one sample in `[-level, level]`. `reset_phase` is the sync pulse output.
    #[inline]
    pub fn tick(&mut self, config: &CarrierConfig, delta: f64, reset_phase: f64, fm: f32) -> f32 {
        if config.sync && reset_phase >= 0.0 {
            // the pulse wrapped `reset_phase` cycles ago
            self.phase = wrap(reset_phase * config.ratio + config.phase);
        }

        let output = config.shape.render(self.phase + fm as f64);

        self.phase = wrap(self.phase + delta * config.ratio);
        output * config.level
    }
}

impl AudioState for CarrierWave {}

// --- Modulator ---

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulatorConfig {
    pub ratio: f64,
    pub phase: f64,
    pub sync: bool,
    pub level: f32,
    /// Amount of the previous output fed back into the phase, in cycles.
    pub feedback: f64,
    pub shape: MorphShape,
}

impl ModulatorConfig {
    pub fn new(unit: &dyn ModulatorUnit) -> Self {
        Self {
            ratio: unit.pitch().max(0.0),
            phase: wrap(unit.phase()),
            sync: unit.sync(),
            level: unit.level(),
            feedback: unit.feedback(),
            shape: MorphShape::new(unit.shape_x(), unit.shape_y()),
        }
    }
}

impl Default for ModulatorConfig {
    fn default() -> Self {
        Self {
            ratio: 1.0,
            phase: 0.0,
            sync: false,
            level: 0.0,
            feedback: 0.0,
            shape: MorphShape::default(),
        }
    }
}

impl EventConfig for ModulatorConfig {}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModulatorWave {
    phase: f64,
    output: f32,
}

impl ModulatorWave {
    pub fn start(&mut self, config: &ModulatorConfig) {
        self.phase = config.phase;
        self.output = 0.0;
    }

    #[inline]
    pub fn tick(&mut self, config: &ModulatorConfig, delta: f64, reset_phase: f64) -> f32 {
        if config.sync && reset_phase >= 0.0 {
            self.phase = wrap(reset_phase * config.ratio + config.phase);
        }

        let actual = self.phase + config.feedback * self.output as f64;
        self.output = config.shape.render(actual);

        self.phase = wrap(self.phase + delta * config.ratio);
        self.output * config.level
    }
}

impl AudioState for ModulatorWave {}
