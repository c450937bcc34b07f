use super::math::{finite_or_half, tri_to_sin, tri_to_sin2};
use super::tier::EventConfig;

const MAX_SLOPE: f32 = 48_000.0;

/// Triangle-centred morph used by carriers.
///
/// `shape_x` skews the rising against the falling half. Positive `shape_y` flattens the
/// triangle into a square, negative `shape_y` rounds it into a sine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarrierShape {
    tri_factor: f32,
    sin_factor: f32,
    up_slope: f32,
    down_slope: f32,
    up_end: f32,
    down_start: f32,
}

impl CarrierShape {
    pub fn new(shape_x: f32, shape_y: f32) -> Self {
        let x = shape_x.clamp(-1.0, 1.0);
        let y = shape_y.clamp(-1.0, 1.0);
        let flatness = if y > 0.0 { 1.0 - y } else { 1.0 };
        Self {
            tri_factor: if y > 0.0 { 2.0 } else { (1.0 + y) * 2.0 },
            sin_factor: if y > 0.0 { 0.0 } else { -y },
            up_slope: 1.0 / flatness / (0.5 + x * 0.5),
            down_slope: 1.0 / flatness / (0.5 - x * 0.5),
            up_end: (0.25 + x * 0.25) * flatness,
            down_start: 0.5 - (0.25 - x * 0.25) * flatness,
        }
    }

    /// Waveform value in `[-1, 1]` at `phase` (cycles, any range).
    #[inline]
    pub fn render(&self, phase: f64) -> f32 {
        // centre on zero: -0.5..0.5
        let a = (phase - phase.floor() - 0.5) as f32;
        let abs = a.abs();
        let output = if abs < self.up_end {
            a * self.up_slope
        } else if abs > self.down_start {
            (a.signum() * 0.5 - a) * self.down_slope
        } else if a >= 0.0 {
            0.5
        } else {
            -0.5
        };
        let output = finite_or_half(output);

        if self.sin_factor > 0.0 {
            output * self.tri_factor + tri_to_sin(output * 2.0) * self.sin_factor
        } else {
            output * self.tri_factor
        }
    }
}

impl Default for CarrierShape {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl EventConfig for CarrierShape {}

/// Sine-centred morph used by modulators and the LFO.
///
/// Positive `shape_y` squares the sine off, negative `shape_y` straightens it into a
/// triangle. `shape_x` skews the slopes as for [`CarrierShape`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphShape {
    sin_factor: f32,
    up_slope: f32,
    down_slope: f32,
}

impl MorphShape {
    pub fn new(shape_x: f32, shape_y: f32) -> Self {
        let x = shape_x.clamp(-1.0, 1.0);
        let y = shape_y.clamp(-1.0, 1.0);
        let flatness = (1.0 - y).min(1.0);
        Self {
            sin_factor: if y > 0.0 { 1.0 } else { 1.0 + y },
            up_slope: (4.0 / flatness / (1.0 + x)).min(MAX_SLOPE),
            down_slope: -(4.0 / flatness / (1.0 - x)).min(MAX_SLOPE),
        }
    }

    #[inline]
    pub fn render(&self, phase: f64) -> f32 {
        let up = (((phase - phase.round()) as f32).abs() * self.up_slope).min(1.0);
        let down = ((phase - phase.floor() - 0.5) as f32) * self.down_slope;
        tri_to_sin2(finite_or_half(down).clamp(-up, up), self.sin_factor)
    }
}

impl Default for MorphShape {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl EventConfig for MorphShape {}
