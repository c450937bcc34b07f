/// A note-on or note-off. Off events carry a negative velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidiNote {
    pub channel: i16,
    pub pitch: i16,
    pub velocity: f32,
    pub note_id: i32,
}

impl MidiNote {
    pub const OFF_VELOCITY: f32 = -1.0;
    /// Note id for hosts without per-note ids; such notes are matched by pitch.
    pub const GLOBAL_NOTE_ID: i32 = -1;
    pub const OFF: Self = Self::new(0, 0, Self::OFF_VELOCITY, Self::GLOBAL_NOTE_ID);

    pub const fn new(channel: i16, pitch: i16, velocity: f32, note_id: i32) -> Self {
        Self {
            channel,
            pitch,
            velocity,
            note_id,
        }
    }

    pub const fn on(channel: i16, pitch: i16, velocity: f32) -> Self {
        Self::new(channel, pitch, velocity, Self::GLOBAL_NOTE_ID)
    }

    pub const fn off(channel: i16, pitch: i16) -> Self {
        Self::new(channel, pitch, Self::OFF_VELOCITY, Self::GLOBAL_NOTE_ID)
    }

    #[inline]
    pub fn is_on(&self) -> bool {
        self.velocity >= 0.0
    }

    /// True if both refer to the same sounding note: same channel and note id, or same
    /// pitch when either side has no id.
    pub fn is_same(&self, other: &MidiNote) -> bool {
        same_key(
            (self.channel, self.pitch, self.note_id),
            (other.channel, other.pitch, other.note_id),
        )
    }
}

impl Default for MidiNote {
    fn default() -> Self {
        Self::OFF
    }
}

/// Polyphonic after-touch for one held note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolyPressure {
    pub channel: i16,
    pub pitch: i16,
    pub pressure: f32,
    pub note_id: i32,
}

impl PolyPressure {
    pub const fn new(channel: i16, pitch: i16, pressure: f32, note_id: i32) -> Self {
        Self {
            channel,
            pitch,
            pressure,
            note_id,
        }
    }

    pub fn targets(&self, note: &MidiNote) -> bool {
        note.is_on()
            && same_key(
                (self.channel, self.pitch, self.note_id),
                (note.channel, note.pitch, note.note_id),
            )
    }
}

impl Default for PolyPressure {
    fn default() -> Self {
        Self::new(0, 0, 0.0, MidiNote::GLOBAL_NOTE_ID)
    }
}

fn same_key(a: (i16, i16, i32), b: (i16, i16, i32)) -> bool {
    if a.0 != b.0 {
        return false;
    }
    if a.2 == MidiNote::GLOBAL_NOTE_ID || b.2 == MidiNote::GLOBAL_NOTE_ID {
        return a.1 == b.1;
    }
    a.2 == b.2
}
