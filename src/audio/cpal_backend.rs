use crate::audio::AudioBackend;
use crate::error::{Error, Result};
use crate::runtime::NativeSynth;
use crate::synth::config::DEFAULT_BUFFER_SIZE;
use crate::synth::SynthConfig;
#[cfg(feature = "assert-allocs")]
use assert_no_alloc::assert_no_alloc;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, Stream};
use log::{error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

/// Fixed device block size requested from cpal, in frames.
const DEVICE_BLOCK: u32 = 256;

pub struct CpalBackend {
    stream: Option<Stream>,
    synth: Arc<Mutex<NativeSynth>>,
    /// Case-insensitive substring of the output device name to use.
    preferred_device: Option<String>,
}

fn device_error<E: std::fmt::Display>(err: E) -> Error {
    Error::AudioDevice(err.to_string())
}

/// Picks the first output whose name contains `preferred`. Without a preference, Linux hosts
/// favour the PipeWire or ALSA `default:` endpoints over raw hardware devices.
fn find_output_device(host: &Host, preferred: Option<&str>) -> Result<Device> {
    let wanted: Vec<String> = match preferred {
        Some(name) => vec![name.to_lowercase()],
        None if cfg!(target_os = "linux") => vec!["pipewire".into(), "default:".into()],
        None => Vec::new(),
    };

    let outputs: Vec<Device> = host.output_devices().map_err(device_error)?.collect();
    for pattern in &wanted {
        let found = outputs.iter().find(|device| {
            device
                .name()
                .map(|name| name.to_lowercase().contains(pattern.as_str()))
                .unwrap_or(false)
        });
        if let Some(device) = found {
            return Ok(device.clone());
        }
    }

    if let Some(name) = preferred {
        warn!("No output device matches {:?}, using the default", name);
    }
    host.default_output_device()
        .ok_or_else(|| Error::AudioDevice("no output device available".into()))
}

impl CpalBackend {
    pub fn new(synth: Arc<Mutex<NativeSynth>>, preferred_device: Option<String>) -> Self {
        Self {
            stream: None,
            synth,
            preferred_device,
        }
    }

    fn lock_synth(&self) -> Result<MutexGuard<'_, NativeSynth>> {
        self.synth
            .lock()
            .map_err(|_| Error::AudioDevice("synth state poisoned".into()))
    }

    fn build_stream(&mut self) -> Result<Stream> {
        let host = cpal::default_host();
        let device = find_output_device(&host, self.preferred_device.as_deref())?;
        info!(
            "Output device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".into())
        );

        let supported = device.default_output_config().map_err(device_error)?;
        let format = supported.sample_format();
        if format != SampleFormat::F32 {
            return Err(Error::AudioDevice(format!(
                "unsupported sample format {:?}",
                format
            )));
        }

        let mut stream_config: cpal::StreamConfig = supported.into();
        stream_config.buffer_size = cpal::BufferSize::Fixed(DEVICE_BLOCK);
        let channels = stream_config.channels as usize;

        let config = SynthConfig::new(stream_config.sample_rate.0 as f64, DEFAULT_BUFFER_SIZE)?;
        self.lock_synth()?.activate(config)?;

        let synth = Arc::clone(&self.synth);
        let callback = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| match synth.lock() {
            Ok(mut synth) => {
                synth.receive_notes();
                #[cfg(not(feature = "assert-allocs"))]
                synth.render(data, channels);
                #[cfg(feature = "assert-allocs")]
                assert_no_alloc(|| synth.render(data, channels));
            }
            Err(_) => data.fill(0.0),
        };

        device
            .build_output_stream(
                &stream_config,
                callback,
                |err| error!("Stream error: {}", err),
                None,
            )
            .map_err(device_error)
    }
}

impl AudioBackend for CpalBackend {
    fn start(&mut self) -> Result<()> {
        let stream = self.build_stream()?;
        stream.play().map_err(device_error)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.pause().map_err(device_error)?;
        }
        self.lock_synth()?.deactivate()
    }
}
