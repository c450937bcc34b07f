//! Trig-free waveshaping helpers and pitch/rate conversions.
//!
//! Phases are expressed in cycles (`0.0..1.0`), pitches in MIDI semitones.

// Taylor coefficients of sin(πx/2), truncated after x⁷.
const A1: f32 = 1.570_796_3;
const A1B: f32 = 0.570_796_3;
const A3: f32 = 0.645_964_1;
const A5: f32 = 0.079_692_63;
const A7: f32 = 0.004_681_754;

/// Overshoot that lets exponential envelope segments land exactly on their target.
pub const EXP_THRESHOLD: f64 = 1.0 / 16.0;
pub const GLIDE_EXP_THRESHOLD: f64 = 1.0 / 32.0;

/// Triangle in `[-1, 1]` from a phase in cycles, aligned so that `tri_to_sin(tri(x))` tracks
/// `sin(2πx)`.
#[inline]
pub fn tri(x: f32) -> f32 {
    let a = x - 0.75;
    ((a - a.round()) * 4.0).abs() - 1.0
}

/// Bends a `[-1, 1]` triangle into an approximate sine.
#[inline]
pub fn tri_to_sin(tri: f32) -> f32 {
    let tri2 = tri * tri;
    (((-A7 * tri2 + A5) * tri2 - A3) * tri2 + A1) * tri
}

/// Blends between the raw triangle (`b = 0`) and `tri_to_sin` (`b = 1`).
#[inline]
pub fn tri_to_sin2(tri: f32, b: f32) -> f32 {
    if b <= 0.0 {
        return tri;
    }
    let tri2 = tri * tri;
    (b * (((-A7 * tri2 + A5) * tri2 - A3) * tri2 + A1B) + 1.0) * tri
}

/// Approximate `sin(2πx)` for a phase in cycles.
#[inline]
pub fn sin(x: f32) -> f32 {
    tri_to_sin(tri(x))
}

pub fn pitch_to_freq(pitch: f64) -> f64 {
    55.0 * 2f64.powf((pitch.min(127.0) - 33.0) / 12.0)
}

/// Phase increment per sample for a pitch.
pub fn pitch_to_delta(pitch: f64, sample_rate: f64) -> f64 {
    pitch_to_freq(pitch) / sample_rate
}

/// Maps a 0-80 envelope parameter onto seconds: 1 ms at 0, 10 s at 80.
pub fn envelope_seconds(value: i32) -> f64 {
    10f64.powf(value as f64 / 20.0 - 3.0)
}

/// Linear attack increment per sample.
pub fn attack_delta(value: i32, sample_rate: f64) -> f64 {
    1.0 / (envelope_seconds(value) * sample_rate)
}

/// Per-sample coefficient for `level += (target - level) * rate`, chosen so the curve
/// covers all but `EXP_THRESHOLD` of the distance in the parameter's duration.
pub fn envelope_rate(value: i32, sample_rate: f64) -> f64 {
    1.0 - EXP_THRESHOLD.powf(1.0 / (envelope_seconds(value) * sample_rate))
}

/// Per-sample glide coefficient for a glide time in hundredths of a second.
pub fn glide_rate(glide: i32, sample_rate: f64) -> f64 {
    if glide <= 0 {
        1.0
    } else {
        1.0 - GLIDE_EXP_THRESHOLD.powf(100.0 / (glide as f64 * sample_rate))
    }
}

/// Left/right gains for a pan in `[-1, 1]`. The pair always sums to 2, so the centre is
/// unity on both sides.
#[inline]
pub fn pan_level(pan: f32) -> (f32, f32) {
    let s = sin(pan * 0.25);
    (1.0 - s, 1.0 + s)
}

/// Replaces a non-finite waveform value with a signed half-amplitude fallback.
#[inline]
pub fn finite_or_half(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else if value.is_nan() {
        0.0
    } else if value > 0.0 {
        0.5
    } else {
        -0.5
    }
}

/// Wraps a phase into `[0, 1)`.
#[inline]
pub fn wrap(phase: f64) -> f64 {
    phase - phase.floor()
}
