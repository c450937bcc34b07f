use log::{debug, info};

use super::config::{validate_sample_rate, MAX_VOICES};
use super::delay::Delay;
use super::note::{MidiNote, PolyPressure};
use super::params::SynthModel;
use super::scheduler::{MidiVoice, VoiceScheduler};
use super::stacked::StackedVoice;
use super::tier::AudioState;
use super::tuning::Tuning;
use super::voice::VoiceState;
use super::voice_config::ConfigSet;
use crate::error::Result;

/// Everything that exists only while the processor is active.
struct Engine {
    config: ConfigSet,
    scheduler: VoiceScheduler,
    voices: [StackedVoice; MAX_VOICES],
    delay: Delay,
    tuning: Tuning,
}

impl Engine {
    fn new(model: &dyn SynthModel, sample_rate: f64) -> Self {
        Self {
            config: ConfigSet::new(model, sample_rate),
            scheduler: VoiceScheduler::new(),
            voices: [StackedVoice::default(); MAX_VOICES],
            delay: Delay::new(sample_rate),
            tuning: Tuning::new(model.tuning()),
        }
    }

    fn recalculate(&mut self, model: &dyn SynthModel, sample_rate: f64) {
        self.config.recalculate(model, sample_rate);
        self.tuning.recalculate(model.tuning());
    }

    #[inline]
    fn tick(&mut self, after_touch: f32) -> (f32, f32) {
        self.scheduler.tick();

        let config = &self.config;
        let tuning = &self.tuning;
        let mut left = 0.0;
        let mut right = 0.0;
        if config.glide.polyphony {
            for (voice, midi) in self.voices.iter_mut().zip(self.scheduler.voices()) {
                let (l, r) = voice.tick(midi, config, tuning, after_touch);
                left += l;
                right += r;
            }
        } else {
            // one voice follows the newest held note, the rest only finish their release
            let latest = self.scheduler.latest_held().copied().unwrap_or_default();
            let released = MidiVoice::default();
            for (i, voice) in self.voices.iter_mut().enumerate() {
                let midi = if i == 0 { &latest } else { &released };
                let (l, r) = voice.tick(midi, config, tuning, after_touch);
                left += l;
                right += r;
            }
        }

        let (left, right) = self.delay.mix(&config.delay, left, right);
        (left * config.master, right * config.master)
    }
}

/// Top-level renderer: owns the voice pool, the scheduler, tuning tables and the delay.
///
/// The host calls [`Processor::on_active`] when audio starts or stops, [`Processor::recalculate`]
/// whenever parameters may have changed, and [`Processor::process_main`] once per block.
/// Only `on_active` allocates.
#[derive(Default)]
pub struct Processor {
    engine: Option<Box<Engine>>,
}

impl Processor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    pub fn on_active(
        &mut self,
        active: bool,
        model: &dyn SynthModel,
        sample_rate: f64,
    ) -> Result<()> {
        if !active {
            if self.engine.take().is_some() {
                info!("Processor deactivated");
            }
            return Ok(());
        }

        validate_sample_rate(sample_rate)?;
        self.engine = Some(Box::new(Engine::new(model, sample_rate)));
        info!(
            "Processor activated at {} Hz with {} voices",
            sample_rate, MAX_VOICES
        );
        Ok(())
    }

    /// Rebuilds every config from `model`. Cheap enough to call once per block.
    pub fn recalculate(&mut self, model: &dyn SynthModel, sample_rate: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.recalculate(model, sample_rate);
        }
    }

    /// Schedules a note-on or note-off `offset` samples into the next block.
    pub fn reserve_note(&mut self, note: MidiNote, offset: i32) {
        match self.engine.as_mut() {
            Some(engine) => engine.scheduler.reserve_note(note, offset),
            None => debug!("Dropped note {} while inactive", note.pitch),
        }
    }

    pub fn reserve_pressure(&mut self, pressure: PolyPressure, offset: i32) {
        if let Some(engine) = self.engine.as_mut() {
            engine.scheduler.reserve_pressure(pressure, offset);
        }
    }

    /// Renders `count` samples into `left` and `right`, overwriting them. An inactive
    /// processor writes silence.
    pub fn process_main(
        &mut self,
        model: &dyn SynthModel,
        sample_rate: f64,
        count: usize,
        left: &mut [f32],
        right: &mut [f32],
    ) {
        let count = count.min(left.len()).min(right.len());
        let Some(engine) = self.engine.as_mut() else {
            left[..count].fill(0.0);
            right[..count].fill(0.0);
            return;
        };

        if engine.config.sample_rate != sample_rate {
            engine.recalculate(model, sample_rate);
        }

        let after_touch = model.after_touch().clamp(0.0, 1.0);
        for (l, r) in left[..count].iter_mut().zip(right[..count].iter_mut()) {
            (*l, *r) = engine.tick(after_touch);
        }
    }

    /// Number of voices currently producing sound.
    pub fn sounding_voices(&self) -> usize {
        self.engine.as_ref().map_or(0, |engine| {
            engine
                .voices
                .iter()
                .filter(|v| v.state() != VoiceState::Inactive)
                .count()
        })
    }

    /// Clears voices, pending events and the delay line without reallocating.
    pub fn panic(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.scheduler.reset();
            engine.voices = [StackedVoice::default(); MAX_VOICES];
            engine.delay.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::params::Patch;

    #[test]
    fn rejects_bad_sample_rates() {
        let mut processor = Processor::new();
        let patch = Patch::default();
        assert!(processor.on_active(true, &patch, 0.0).is_err());
        assert!(processor.on_active(true, &patch, f64::NAN).is_err());
        assert!(!processor.is_active());
        assert!(processor.on_active(true, &patch, 48_000.0).is_ok());
        assert!(processor.is_active());
        assert!(processor.on_active(false, &patch, 48_000.0).is_ok());
        assert!(!processor.is_active());
    }

    #[test]
    fn inactive_processor_writes_silence() {
        let mut processor = Processor::new();
        let patch = Patch::default();
        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        processor.reserve_note(MidiNote::on(0, 60, 1.0), 0);
        processor.process_main(&patch, 44_100.0, 64, &mut left, &mut right);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn panic_silences_everything() {
        let mut processor = Processor::new();
        let patch = Patch::default();
        processor.on_active(true, &patch, 44_100.0).unwrap();
        processor.reserve_note(MidiNote::on(0, 60, 1.0), 0);
        let mut left = [0.0f32; 128];
        let mut right = [0.0f32; 128];
        processor.process_main(&patch, 44_100.0, 128, &mut left, &mut right);
        assert_eq!(processor.sounding_voices(), 1);

        processor.panic();
        processor.process_main(&patch, 44_100.0, 128, &mut left, &mut right);
        assert_eq!(processor.sounding_voices(), 0);
        assert!(left.iter().all(|&s| s == 0.0));
    }
}
