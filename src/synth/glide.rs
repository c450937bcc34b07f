use super::math::glide_rate;
use super::params::InputUnit;
use super::tier::{AudioState, EventConfig};

const SNAP_THRESHOLD: f64 = 1.0 / 128.0;

/// Voice mode derived from the glide parameter: negative is polyphonic, zero is
/// monophonic, positive is monophonic with portamento lasting that many centiseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlideConfig {
    pub enabled: bool,
    pub polyphony: bool,
    pub rate: f64,
}

impl GlideConfig {
    pub fn new(glide: i32, sample_rate: f64) -> Self {
        Self {
            enabled: glide > 0,
            polyphony: glide < 0,
            rate: glide_rate(glide, sample_rate),
        }
    }

    pub fn from_unit(unit: &dyn InputUnit, sample_rate: f64) -> Self {
        Self::new(unit.glide(), sample_rate)
    }
}

impl Default for GlideConfig {
    fn default() -> Self {
        Self::new(-1, 44_100.0)
    }
}

impl EventConfig for GlideConfig {}

/// Exponential pitch follower.
#[derive(Debug, Clone, Copy, Default)]
pub struct Glide {
    target: f64,
    current: f64,
}

impl Glide {
    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn set_target(&mut self, pitch: f64) {
        self.target = pitch;
    }

    /// Jumps straight to `pitch`.
    pub fn jump(&mut self, pitch: f64) {
        self.target = pitch;
        self.current = pitch;
    }

    #[inline]
    pub fn tick(&mut self, config: &GlideConfig) -> f64 {
        let diff = self.target - self.current;
        if diff.abs() <= SNAP_THRESHOLD {
            self.current = self.target;
        } else {
            self.current += diff * config.rate;
        }
        self.current
    }
}

impl AudioState for Glide {}
