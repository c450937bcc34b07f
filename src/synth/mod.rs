pub mod config;
pub mod core;
pub mod delay;
pub mod envelope;
pub mod filter;
pub mod glide;
pub mod lfo;
pub mod math;
pub mod modulation;
pub mod note;
pub mod operator;
pub mod params;
pub mod scheduler;
pub mod stacked;
pub mod tier;
pub mod tuning;
pub mod voice;
pub mod voice_config;
pub mod waveform;

pub use self::config::SynthConfig;
pub use self::core::Processor;
pub use self::note::{MidiNote, PolyPressure};
pub use self::params::{Patch, SynthModel};
