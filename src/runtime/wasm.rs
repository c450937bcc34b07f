use crate::synth::{MidiNote, Patch, Processor, SynthConfig};
use js_sys::Float32Array;
use wasm_bindgen::prelude::*;

/// Browser host (no threads, no channels, direct API). Renders one channel per call into
/// scratch buffers sized by `set_buffer_size`.
#[wasm_bindgen]
pub struct WasmSynth {
    processor: Processor,
    patch: Patch,
    config: SynthConfig,
    left: Vec<f32>,
    right: Vec<f32>,
}

#[wasm_bindgen]
impl WasmSynth {
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmSynth {
        WasmSynth {
            processor: Processor::new(),
            patch: Patch::default(),
            config: SynthConfig::default(),
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Activates the processor. Must be called before rendering.
    #[wasm_bindgen]
    pub fn start(&mut self, sample_rate: f64, buffer_size: usize) -> Result<(), JsValue> {
        let config = SynthConfig::new(sample_rate, buffer_size).map_err(to_js)?;
        self.config = config;
        self.left = vec![0.0; buffer_size];
        self.right = vec![0.0; buffer_size];
        self.processor
            .on_active(true, &self.patch, sample_rate)
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn stop(&mut self) -> Result<(), JsValue> {
        self.processor
            .on_active(false, &self.patch, self.config.sample_rate)
            .map_err(to_js)
    }

    /// Replaces the patch with a JSON document. Missing fields keep their defaults.
    #[wasm_bindgen]
    pub fn load_patch(&mut self, json: &str) -> Result<(), JsValue> {
        self.patch = Patch::from_json(json).map_err(to_js)?;
        Ok(())
    }

    /// Renders the next block and returns the left channel.
    #[wasm_bindgen]
    pub fn render(&mut self, length: usize) -> Float32Array {
        let length = length.min(self.left.len());
        self.processor
            .recalculate(&self.patch, self.config.sample_rate);
        self.processor.process_main(
            &self.patch,
            self.config.sample_rate,
            length,
            &mut self.left,
            &mut self.right,
        );
        Float32Array::from(&self.left[..length])
    }

    /// Right channel of the last `render` call.
    #[wasm_bindgen]
    pub fn right(&self, length: usize) -> Float32Array {
        Float32Array::from(&self.right[..length.min(self.right.len())])
    }

    #[wasm_bindgen]
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let velocity = velocity.min(127) as f32 / 127.0;
        self.processor
            .reserve_note(MidiNote::on(0, note.min(127) as i16, velocity), 0);
    }

    #[wasm_bindgen]
    pub fn note_off(&mut self, note: u8) {
        self.processor
            .reserve_note(MidiNote::off(0, note.min(127) as i16), 0);
    }

    #[wasm_bindgen]
    pub fn set_master(&mut self, master: f32) {
        self.patch.master = master.clamp(0.0, 1.0);
    }
}

impl Default for WasmSynth {
    fn default() -> Self {
        Self::new()
    }
}

fn to_js(err: crate::Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}
