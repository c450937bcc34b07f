use crate::audio::{AudioBackend, CpalBackend};
use crate::error::Result;
use crate::input::KeyboardHandler;
use crate::synth::{MidiNote, Patch, Processor, SynthConfig};
use log::{info, warn};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Desktop host: owns the processor, the patch and the scratch buffers the audio callback
/// renders into.
pub struct NativeSynth {
    processor: Processor,
    patch: Patch,
    config: SynthConfig,
    note_receiver: Receiver<MidiNote>,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl NativeSynth {
    pub fn new(patch: Patch, note_receiver: Receiver<MidiNote>) -> Self {
        Self {
            processor: Processor::new(),
            patch,
            config: SynthConfig::default(),
            note_receiver,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Activates the processor for a device and sizes the scratch buffers.
    pub fn activate(&mut self, config: SynthConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.left = vec![0.0; config.buffer_size];
        self.right = vec![0.0; config.buffer_size];
        self.processor
            .on_active(true, &self.patch, config.sample_rate)?;
        self.processor.recalculate(&self.patch, config.sample_rate);
        info!(
            "Native synth ready: {} Hz, {} frame blocks",
            config.sample_rate, config.buffer_size
        );
        Ok(())
    }

    pub fn deactivate(&mut self) -> Result<()> {
        self.processor
            .on_active(false, &self.patch, self.config.sample_rate)
    }

    /// Moves notes queued by the input thread into the processor.
    pub fn receive_notes(&mut self) {
        while let Ok(note) = self.note_receiver.try_recv() {
            self.processor.reserve_note(note, 0);
        }
    }

    /// Renders interleaved frames of `channels` samples. Stereo goes to the first two
    /// channels, mono devices get the left side.
    pub fn render(&mut self, output: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let sample_rate = self.config.sample_rate;
        self.processor.recalculate(&self.patch, sample_rate);

        let block = self.left.len().max(1);
        for frames in output.chunks_mut(block * channels) {
            let count = (frames.len() / channels).min(self.left.len());
            self.processor.process_main(
                &self.patch,
                sample_rate,
                count,
                &mut self.left,
                &mut self.right,
            );
            for (i, frame) in frames.chunks_mut(channels).enumerate().take(count) {
                frame[0] = self.left[i];
                if channels > 1 {
                    frame[1] = self.right[i];
                    frame[2..].fill(0.0);
                }
            }
        }
    }
}

/// Runs the desktop synth until the keyboard thread loses its audio side. `device` selects
/// an output by name.
pub fn start(patch: Patch, device: Option<String>) -> Result<()> {
    let (note_tx, note_rx) = channel();

    let synth = Arc::new(Mutex::new(NativeSynth::new(patch, note_rx)));

    let mut audio_backend = CpalBackend::new(synth.clone(), device);
    audio_backend.start()?;

    let mut keyboard_handler = KeyboardHandler::new(note_tx);
    info!("Play with A-; (white keys) and W-[ (black keys), Z/X shift octaves");

    loop {
        if !keyboard_handler.update() {
            warn!("Audio thread is gone, stopping");
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    audio_backend.stop()
}
