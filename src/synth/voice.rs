use super::glide::{Glide, GlideConfig};
use super::math::pitch_to_delta;
use super::scheduler::MidiVoice;
use super::tier::AudioState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Inactive,
    Active,
    Release,
}

/// What changed on the sample a voice was ticked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEvent {
    None,
    /// An inactive voice received a note.
    StartNote,
    /// A sounding voice received a new note.
    RestartNote,
    /// The held note's pitch moved without a new note.
    PitchChanged,
}

/// Note tracking for one voice slot: lifecycle, velocity, pressure and the gliding pitch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthVoice {
    pub state: VoiceState,
    pub velocity: f32,
    pub pressure: f32,
    /// Current pitch in semitones, after glide.
    pub pitch: f64,
    /// Phase increment per sample at `pitch`.
    pub delta: f64,
    glide: Glide,
}

impl SynthVoice {
    /// Follows `midi` for one sample. `target_pitch` is the tuned, bent pitch of its note.
    #[inline]
    pub fn tick(
        &mut self,
        midi: &MidiVoice,
        glide: &GlideConfig,
        target_pitch: f64,
        after_touch: f32,
        sample_rate: f64,
    ) -> VoiceEvent {
        let mut event = VoiceEvent::None;

        if midi.note.is_on() {
            let was_inactive = self.state == VoiceState::Inactive;
            self.state = VoiceState::Active;
            self.velocity = midi.note.velocity;
            self.pressure = midi.poly_pressure.max(after_touch);

            if was_inactive {
                // also covers picking up a note that was assigned before this voice woke
                self.glide.jump(target_pitch);
                event = VoiceEvent::StartNote;
            } else if midi.length == 1 {
                if glide.enabled {
                    self.glide.set_target(target_pitch);
                } else {
                    self.glide.jump(target_pitch);
                }
                event = VoiceEvent::RestartNote;
            } else if self.glide.target() != target_pitch {
                if glide.enabled {
                    self.glide.set_target(target_pitch);
                } else {
                    self.glide.jump(target_pitch);
                }
                event = VoiceEvent::PitchChanged;
            }
        } else if self.state == VoiceState::Active {
            self.state = VoiceState::Release;
        }

        if self.state != VoiceState::Inactive {
            self.pitch = self.glide.tick(glide);
            self.delta = pitch_to_delta(self.pitch, sample_rate);
        }
        event
    }
}

impl AudioState for SynthVoice {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::note::MidiNote;

    const SAMPLE_RATE: f64 = 44_100.0;

    fn held(pitch: i16, length: i32) -> MidiVoice {
        MidiVoice {
            length,
            ..MidiVoice::new(MidiNote::on(0, pitch, 0.8))
        }
    }

    #[test]
    fn lifecycle_events() {
        let glide = GlideConfig::new(-1, SAMPLE_RATE);
        let mut voice = SynthVoice::default();

        let event = voice.tick(&held(60, 1), &glide, 60.0, 0.0, SAMPLE_RATE);
        assert_eq!(event, VoiceEvent::StartNote);
        assert_eq!(voice.state, VoiceState::Active);
        assert_eq!(voice.pitch, 60.0);
        assert_eq!(voice.velocity, 0.8);

        let event = voice.tick(&held(60, 2), &glide, 60.0, 0.0, SAMPLE_RATE);
        assert_eq!(event, VoiceEvent::None);

        let event = voice.tick(&held(60, 3), &glide, 62.0, 0.0, SAMPLE_RATE);
        assert_eq!(event, VoiceEvent::PitchChanged);
        assert_eq!(voice.pitch, 62.0);

        let event = voice.tick(&held(64, 1), &glide, 64.0, 0.0, SAMPLE_RATE);
        assert_eq!(event, VoiceEvent::RestartNote);

        voice.tick(&MidiVoice::default(), &glide, 0.0, 0.0, SAMPLE_RATE);
        assert_eq!(voice.state, VoiceState::Release);
        assert_eq!(voice.pitch, 64.0);
    }

    #[test]
    fn inactive_voice_starts_on_an_already_held_note() {
        let glide = GlideConfig::new(20, SAMPLE_RATE);
        let mut voice = SynthVoice::default();
        voice.tick(&held(48, 1), &glide, 48.0, 0.0, SAMPLE_RATE);
        voice.tick(&MidiVoice::default(), &glide, 0.0, 0.0, SAMPLE_RATE);
        voice.state = VoiceState::Inactive;

        let event = voice.tick(&held(67, 900), &glide, 67.0, 0.0, SAMPLE_RATE);
        assert_eq!(event, VoiceEvent::StartNote);
        assert_eq!(voice.state, VoiceState::Active);
        assert_eq!(voice.pitch, 67.0);
    }

    #[test]
    fn legato_glides_from_the_previous_note() {
        let glide = GlideConfig::new(20, SAMPLE_RATE);
        let mut voice = SynthVoice::default();
        voice.tick(&held(60, 1), &glide, 60.0, 0.0, SAMPLE_RATE);
        assert_eq!(voice.pitch, 60.0);

        voice.tick(&held(72, 1), &glide, 72.0, 0.0, SAMPLE_RATE);
        assert!(voice.pitch > 60.0 && voice.pitch < 72.0);
    }

    #[test]
    fn pressure_takes_the_larger_source() {
        let glide = GlideConfig::default();
        let mut voice = SynthVoice::default();
        let mut midi = held(60, 1);
        midi.poly_pressure = 0.3;
        voice.tick(&midi, &glide, 60.0, 0.6, SAMPLE_RATE);
        assert_eq!(voice.pressure, 0.6);
        voice.tick(&midi, &glide, 60.0, 0.1, SAMPLE_RATE);
        assert_eq!(voice.pressure, 0.3);
    }

    #[test]
    fn inactive_voice_ignores_note_off() {
        let mut voice = SynthVoice::default();
        voice.tick(&MidiVoice::default(), &GlideConfig::default(), 0.0, 0.0, SAMPLE_RATE);
        assert_eq!(voice.state, VoiceState::Inactive);
    }
}
