use stackfm::synth::params::{Rational, TuningPatch};
use stackfm::synth::tuning::Tuning;

#[test]
fn test_equal_temperament_is_identity() {
    let tuning = Tuning::new(&TuningPatch::default());
    for channel in 0..16 {
        for key in 0..128 {
            let pitch = tuning.pitch(channel, key);
            assert!(
                (pitch - key as f64).abs() < 1e-9,
                "channel {channel} key {key} -> {pitch}"
            );
        }
    }
}

#[test]
fn test_nineteen_tone_equal_temperament() {
    let mut patch = TuningPatch {
        key_period: 19,
        ..TuningPatch::default()
    };
    for channel in patch.channels.iter_mut() {
        channel.generator = Rational::new(2, 1, 1, 19);
    }
    let tuning = Tuning::new(&patch);

    let step = 12.0 / 19.0;
    println!("19-EDO step {step} semitones");
    assert!((tuning.pitch(0, 69) - 69.0).abs() < 1e-9);
    assert!((tuning.pitch(0, 70) - (69.0 + step)).abs() < 1e-9);
    assert!((tuning.pitch(0, 88) - 81.0).abs() < 1e-9);
    assert!((tuning.pitch(0, 50) - 57.0).abs() < 1e-9);
}

#[test]
fn test_channels_are_tuned_independently() {
    let mut patch = TuningPatch::default();
    patch.channels[1].ratio = Rational::new(3, 2, 1, 1);
    let mut tuning = Tuning::new(&patch);

    let fifth = 12.0 * 1.5f64.log2();
    assert!((tuning.pitch(1, 60) - (60.0 + fifth)).abs() < 1e-9);
    assert!((tuning.pitch(0, 60) - 60.0).abs() < 1e-9);

    patch.channels[1].ratio = Rational::UNISON;
    tuning.recalculate(&patch);
    assert!((tuning.pitch(1, 60) - 60.0).abs() < 1e-9);
}

#[test]
fn test_out_of_range_inputs_are_clamped() {
    let mut patch = TuningPatch::default();
    patch.channels[15].ratio = Rational::OCTAVE;
    patch.key_period = 0;
    let tuning = Tuning::new(&patch);

    assert_eq!(tuning.pitch(40, 60), tuning.pitch(15, 60));
    assert!(tuning.pitch(0, 127) <= 128.0);
    assert!(tuning.pitch(0, -5) >= 0.0);
}
