use crate::synth::MidiNote;
use device_query::{DeviceQuery, DeviceState, Keycode};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;

const VELOCITY: f32 = 0.8;
const MAX_OCTAVE_SHIFT: i16 = 4;

/// Semitones above C of each key. The home row plays naturals, the row above plays
/// sharps, one and a half octaves starting from A below middle C.
const KEYMAP: [(Keycode, i16); 17] = [
    (Keycode::A, -3),
    (Keycode::W, -2),
    (Keycode::S, -1),
    (Keycode::D, 0),
    (Keycode::R, 1),
    (Keycode::F, 2),
    (Keycode::T, 3),
    (Keycode::G, 4),
    (Keycode::H, 5),
    (Keycode::U, 6),
    (Keycode::J, 7),
    (Keycode::I, 8),
    (Keycode::K, 9),
    (Keycode::O, 10),
    (Keycode::L, 11),
    (Keycode::Semicolon, 12),
    (Keycode::LeftBracket, 13),
];

/// Turns the computer keyboard into a small piano. Z and X move it down or up an octave.
pub struct KeyboardHandler {
    device_state: DeviceState,
    held: HashMap<Keycode, i16>,
    shift_keys: HashSet<Keycode>,
    octave: i16,
    note_sender: Sender<MidiNote>,
}

impl KeyboardHandler {
    pub fn new(note_sender: Sender<MidiNote>) -> Self {
        Self {
            device_state: DeviceState::new(),
            held: HashMap::new(),
            shift_keys: HashSet::new(),
            octave: 0,
            note_sender,
        }
    }

    fn send(&self, note: MidiNote) -> bool {
        debug!("Keyboard note {:?}", note);
        self.note_sender.send(note).is_ok()
    }

    fn shift_octave(&mut self, keys: &[Keycode]) {
        for (key, step) in [(Keycode::Z, -1), (Keycode::X, 1)] {
            let pressed = keys.contains(&key);
            if pressed && self.shift_keys.insert(key) {
                self.octave = (self.octave + step).clamp(-MAX_OCTAVE_SHIFT, MAX_OCTAVE_SHIFT);
                info!("Keyboard octave {:+}", self.octave);
            } else if !pressed {
                self.shift_keys.remove(&key);
            }
        }
    }

    /// Polls the keyboard and sends a note for every key that changed. Returns false once
    /// the receiving side has hung up.
    pub fn update(&mut self) -> bool {
        let keys: Vec<Keycode> = self.device_state.get_keys();
        self.shift_octave(&keys);

        for (key, offset) in KEYMAP {
            let pressed = keys.contains(&key);
            match (pressed, self.held.get(&key).copied()) {
                (true, None) => {
                    // the pitch is fixed at press time so a later octave shift
                    // still releases the right note
                    let pitch = (60 + offset + 12 * self.octave).clamp(0, 127);
                    if !self.send(MidiNote::on(0, pitch, VELOCITY)) {
                        return false;
                    }
                    self.held.insert(key, pitch);
                }
                (false, Some(pitch)) => {
                    if !self.send(MidiNote::off(0, pitch)) {
                        return false;
                    }
                    self.held.remove(&key);
                }
                _ => {}
            }
        }
        true
    }
}
