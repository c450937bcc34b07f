//! Sample-accurate event scheduling and voice allocation.

use super::config::{MAX_RESERVATIONS, MAX_VOICES};
use super::note::{MidiNote, PolyPressure};
use super::tier::AudioState;

/// An event that acts on the voice pool when its reservation comes due.
pub trait ScheduledEvent: Copy + Default {
    fn apply(&self, voices: &mut [MidiVoice]);
}

/// One slot of the voice pool as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiVoice {
    pub note: MidiNote,
    /// Samples since the voice was last assigned.
    pub length: i32,
    pub poly_pressure: f32,
}

impl MidiVoice {
    pub fn new(note: MidiNote) -> Self {
        Self {
            note,
            length: 0,
            poly_pressure: 0.0,
        }
    }
}

impl Default for MidiVoice {
    fn default() -> Self {
        Self::new(MidiNote::OFF)
    }
}

impl ScheduledEvent for MidiNote {
    fn apply(&self, voices: &mut [MidiVoice]) {
        if self.is_on() {
            note_on(voices, *self);
        } else {
            note_off(voices, self);
        }
    }
}

impl ScheduledEvent for PolyPressure {
    fn apply(&self, voices: &mut [MidiVoice]) {
        for voice in voices.iter_mut().filter(|v| self.targets(&v.note)) {
            voice.poly_pressure = self.pressure;
        }
    }
}

/// Prefers the longest-idle released voice, otherwise steals the longest-held one.
fn note_on(voices: &mut [MidiVoice], note: MidiNote) {
    let mut oldest_on: Option<usize> = None;
    let mut target: Option<usize> = None;
    for (i, voice) in voices.iter().enumerate() {
        let slot = if voice.note.is_on() {
            &mut oldest_on
        } else {
            &mut target
        };
        match *slot {
            Some(j) if voices[j].length >= voice.length => {}
            _ => *slot = Some(i),
        }
    }

    if let Some(i) = target.or(oldest_on) {
        voices[i] = MidiVoice::new(note);
    }
}

fn note_off(voices: &mut [MidiVoice], note: &MidiNote) {
    for voice in voices.iter_mut() {
        if voice.note.is_on() && voice.note.is_same(note) {
            *voice = MidiVoice::new(MidiNote::OFF);
        }
    }
}

/// An event waiting for `offset` more samples. Negative offsets mark a free slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reservation<E> {
    pub event: E,
    pub offset: i32,
}

impl<E: ScheduledEvent> Default for Reservation<E> {
    fn default() -> Self {
        Self {
            event: E::default(),
            offset: -1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Reservations<E> {
    slots: [Reservation<E>; MAX_RESERVATIONS],
}

impl<E: ScheduledEvent> Default for Reservations<E> {
    fn default() -> Self {
        Self {
            slots: [Reservation::default(); MAX_RESERVATIONS],
        }
    }
}

impl<E: ScheduledEvent> Reservations<E> {
    pub fn slots(&self) -> &[Reservation<E>] {
        &self.slots
    }

    pub fn pending(&self) -> impl Iterator<Item = &Reservation<E>> {
        self.slots.iter().filter(|r| r.offset >= 0)
    }

    /// Applies the event now if `offset <= 0`, otherwise stores it. When the ring is full
    /// the reservation furthest in the future is dropped.
    pub fn reserve(&mut self, event: E, offset: i32, voices: &mut [MidiVoice]) {
        if offset <= 0 {
            event.apply(voices);
            return;
        }

        let mut furthest = 0;
        for i in 0..self.slots.len() {
            if self.slots[i].offset < 0 {
                self.slots[i] = Reservation { event, offset };
                return;
            }
            if self.slots[i].offset > self.slots[furthest].offset {
                furthest = i;
            }
        }
        self.slots[furthest] = Reservation { event, offset };
    }

    #[inline]
    pub fn tick(&mut self, voices: &mut [MidiVoice]) {
        for reservation in self.slots.iter_mut() {
            if reservation.offset < 0 {
                continue;
            }
            reservation.offset -= 1;
            if reservation.offset == -1 {
                reservation.event.apply(voices);
            }
        }
    }
}

/// Voice pool plus one reservation ring per event kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoiceScheduler {
    notes: Reservations<MidiNote>,
    pressures: Reservations<PolyPressure>,
    voices: [MidiVoice; MAX_VOICES],
}

impl VoiceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voices(&self) -> &[MidiVoice; MAX_VOICES] {
        &self.voices
    }

    pub fn notes(&self) -> &Reservations<MidiNote> {
        &self.notes
    }

    pub fn pressures(&self) -> &Reservations<PolyPressure> {
        &self.pressures
    }

    pub fn reserve_note(&mut self, note: MidiNote, offset: i32) {
        self.notes.reserve(note, offset, &mut self.voices);
    }

    pub fn reserve_pressure(&mut self, pressure: PolyPressure, offset: i32) {
        self.pressures.reserve(pressure, offset, &mut self.voices);
    }

    /// Advances one sample: applies due events, then ages every voice.
    #[inline]
    pub fn tick(&mut self) {
        self.notes.tick(&mut self.voices);
        self.pressures.tick(&mut self.voices);
        for voice in self.voices.iter_mut() {
            voice.length = voice.length.saturating_add(1);
        }
    }

    /// The most recently assigned held voice, used in mono mode.
    pub fn latest_held(&self) -> Option<&MidiVoice> {
        self.voices
            .iter()
            .filter(|v| v.note.is_on())
            .min_by_key(|v| v.length)
    }
}

impl AudioState for VoiceScheduler {}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(scheduler: &VoiceScheduler) -> Vec<i16> {
        scheduler
            .voices()
            .iter()
            .filter(|v| v.note.is_on())
            .map(|v| v.note.pitch)
            .collect()
    }

    #[test]
    fn immediate_note_on_and_off() {
        let mut scheduler = VoiceScheduler::new();
        scheduler.reserve_note(MidiNote::on(0, 60, 0.8), 0);
        assert_eq!(held(&scheduler), vec![60]);
        scheduler.reserve_note(MidiNote::off(0, 60), -3);
        assert!(held(&scheduler).is_empty());
    }

    #[test]
    fn delayed_note_applies_after_offset_plus_one_ticks() {
        let mut scheduler = VoiceScheduler::new();
        scheduler.reserve_note(MidiNote::on(0, 64, 1.0), 3);
        assert_eq!(scheduler.notes().pending().count(), 1);
        for _ in 0..3 {
            scheduler.tick();
            assert!(held(&scheduler).is_empty());
        }
        scheduler.tick();
        assert_eq!(held(&scheduler), vec![64]);
        assert_eq!(scheduler.notes().pending().count(), 0);
    }

    #[test]
    fn released_voices_are_reused_before_stealing() {
        let mut scheduler = VoiceScheduler::new();
        scheduler.reserve_note(MidiNote::on(0, 60, 1.0), 0);
        scheduler.tick();
        scheduler.reserve_note(MidiNote::off(0, 60), 0);
        scheduler.reserve_note(MidiNote::on(0, 62, 1.0), 0);
        let on = scheduler.voices().iter().filter(|v| v.note.is_on()).count();
        assert_eq!(on, 1);
    }

    #[test]
    fn pressure_reaches_matching_voice() {
        let mut scheduler = VoiceScheduler::new();
        scheduler.reserve_note(MidiNote::new(0, 60, 0.8, 1), 0);
        scheduler.reserve_pressure(PolyPressure::new(0, 60, 0.7, 1), 1);
        let pressure_of_60 = |s: &VoiceScheduler| {
            s.voices()
                .iter()
                .find(|v| v.note.pitch == 60 && v.note.is_on())
                .map(|v| v.poly_pressure)
        };
        scheduler.tick();
        assert_eq!(pressure_of_60(&scheduler), Some(0.0));
        scheduler.tick();
        assert_eq!(pressure_of_60(&scheduler), Some(0.7));
    }

    #[test]
    fn latest_held_is_the_youngest() {
        let mut scheduler = VoiceScheduler::new();
        scheduler.reserve_note(MidiNote::on(0, 60, 1.0), 0);
        scheduler.tick();
        scheduler.reserve_note(MidiNote::on(0, 67, 1.0), 0);
        scheduler.tick();
        assert_eq!(scheduler.latest_held().map(|v| v.note.pitch), Some(67));
        scheduler.reserve_note(MidiNote::off(0, 67), 0);
        assert_eq!(scheduler.latest_held().map(|v| v.note.pitch), Some(60));
    }
}
