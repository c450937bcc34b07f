use super::math::wrap;
use super::params::LfoUnit;
use super::tier::{AudioState, EventConfig};
use super::waveform::MorphShape;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoConfig {
    pub delta: f64,
    pub level: f32,
    pub shape: MorphShape,
    /// False when the level is zero or nothing is routed from the LFO.
    pub active: bool,
}

impl LfoConfig {
    pub fn new(unit: &dyn LfoUnit, routed: bool, sample_rate: f64) -> Self {
        let level = unit.level().max(0.0);
        Self {
            delta: unit.speed().max(0.0) / sample_rate,
            level,
            shape: MorphShape::new(unit.shape_x(), unit.shape_y()),
            active: level > 0.0 && routed,
        }
    }
}

impl EventConfig for LfoConfig {}

/// Free-running low-frequency oscillator, one per voice.
#[derive(Debug, Clone, Copy, Default)]
pub struct LfoWave {
    phase: f64,
}

impl LfoWave {
    /// Renders one sample in `[-level, level] * level_mod` and advances at
    /// `speed * speed_mod` Hz.
    #[inline]
    pub fn tick(&mut self, config: &LfoConfig, speed_mod: f64, level_mod: f64) -> f32 {
        if !config.active {
            return 0.0;
        }

        let output = config.shape.render(self.phase);
        self.phase = wrap(self.phase + config.delta * speed_mod);
        output * config.level * level_mod as f32
    }
}

impl AudioState for LfoWave {}
