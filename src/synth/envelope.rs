use super::math::{attack_delta, envelope_rate, EXP_THRESHOLD};
use super::params::EnvelopeUnit;
use super::tier::{AudioState, EventConfig};

const MAX_THRESHOLD: f64 = 1.0 - EXP_THRESHOLD;

/// Per-sample coefficients of an ADSR envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeConfig {
    pub attack_delta: f64,
    pub decay_rate: f64,
    pub sustain: f64,
    pub release_rate: f64,
}

impl EnvelopeConfig {
    /// `attack`, `decay` and `release` are 0-80 parameter steps (1 ms to 10 s).
    pub fn new(attack: i32, decay: i32, sustain: f32, release: i32, sample_rate: f64) -> Self {
        Self {
            attack_delta: attack_delta(attack.clamp(0, 80), sample_rate),
            decay_rate: envelope_rate(decay.clamp(0, 80), sample_rate),
            sustain: sustain.clamp(0.0, 1.0) as f64,
            release_rate: envelope_rate(release.clamp(0, 80), sample_rate),
        }
    }

    pub fn from_unit<U: EnvelopeUnit + ?Sized>(unit: &U, sample_rate: f64) -> Self {
        Self::new(
            unit.attack(),
            unit.decay(),
            unit.sustain(),
            unit.release(),
            sample_rate,
        )
    }
}

impl EventConfig for EnvelopeConfig {}

/// Linear attack, exponential decay and release.
///
/// The exponential segments aim `EXP_THRESHOLD` past their target so they arrive in finite
/// time, then snap onto it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Envelope {
    level: f64,
    decaying: bool,
}

impl Envelope {
    /// Lets the next note-on start a fresh attack from the current level.
    pub fn restart(&mut self) {
        self.decaying = false;
    }

    pub fn tick(&mut self, config: &EnvelopeConfig, note_on: bool) -> f32 {
        if !note_on {
            // a note-on during release must attack again
            self.decaying = false;

            if self.level <= 0.0 {
                return 0.0;
            }

            self.level -= self.level * config.release_rate;
            if self.level <= EXP_THRESHOLD {
                self.level = 0.0;
                return 0.0;
            }
            (self.level - EXP_THRESHOLD) as f32
        } else if !self.decaying {
            self.level += config.attack_delta;
            if self.level >= MAX_THRESHOLD {
                self.level = 1.0;
                self.decaying = true;
                return 1.0;
            }
            (self.level + EXP_THRESHOLD) as f32
        } else if self.level <= config.sustain {
            self.level as f32
        } else {
            self.level += (config.sustain - self.level) * config.decay_rate;
            if self.level <= config.sustain + EXP_THRESHOLD {
                self.level = config.sustain;
                return self.level as f32;
            }
            (self.level - EXP_THRESHOLD) as f32
        }
    }
}

impl AudioState for Envelope {}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EnvelopeConfig {
        EnvelopeConfig::new(20, 30, 0.5, 30, 44_100.0)
    }

    fn run(envelope: &mut Envelope, config: &EnvelopeConfig, note_on: bool, n: usize) -> Vec<f32> {
        (0..n).map(|_| envelope.tick(config, note_on)).collect()
    }

    #[test]
    fn attack_rises_to_exactly_one() {
        let config = config();
        let mut envelope = Envelope::default();
        let out = run(&mut envelope, &config, true, 441);
        assert_eq!(out.iter().filter(|&&v| v == 1.0).count(), 1);
        assert!(out.iter().all(|&v| v <= 1.0));
        let peak = out.iter().position(|&v| v == 1.0).unwrap();
        let attack = &out[..=peak];
        assert!(attack.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn decay_settles_on_sustain() {
        let config = config();
        let mut envelope = Envelope::default();
        let out = run(&mut envelope, &config, true, 44_100);
        assert_eq!(*out.last().unwrap(), 0.5);
        let after_peak = out.iter().position(|&v| v == 1.0).unwrap();
        assert!(out[after_peak..].windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn release_reaches_exact_zero() {
        let config = config();
        let mut envelope = Envelope::default();
        run(&mut envelope, &config, true, 10_000);
        let release = run(&mut envelope, &config, false, 44_100);
        assert!(release.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*release.last().unwrap(), 0.0);
        assert_eq!(envelope.tick(&config, false), 0.0);
    }

    #[test]
    fn retrigger_mid_release_converges_to_sustain() {
        let config = config();
        let mut envelope = Envelope::default();
        run(&mut envelope, &config, true, 10_000);
        let release = run(&mut envelope, &config, false, 300);
        let released_to = *release.last().unwrap();
        assert!(released_to > 0.0 && released_to < 0.5);

        let again = run(&mut envelope, &config, true, 44_100);
        assert!(again[0] > released_to);
        assert!(again.contains(&1.0));
        assert_eq!(*again.last().unwrap(), 0.5);
    }

    #[test]
    fn reset_silences_and_restart_reattacks() {
        let config = config();
        let mut envelope = Envelope::default();
        run(&mut envelope, &config, true, 10_000);
        envelope.restart();
        let out = envelope.tick(&config, true);
        assert!(out > 0.5);

        envelope.reset();
        assert!(envelope.tick(&config, true) < 0.1);
    }

    #[test]
    fn full_sustain_holds_at_one() {
        let config = EnvelopeConfig::new(0, 0, 1.0, 0, 44_100.0);
        let mut envelope = Envelope::default();
        let out = run(&mut envelope, &config, true, 1000);
        assert_eq!(*out.last().unwrap(), 1.0);
    }
}
