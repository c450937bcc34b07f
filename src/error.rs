use thiserror::Error;

/// Errors raised outside the audio path: activation, patch loading and host devices.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(f64),
    #[error("invalid buffer size: {0}")]
    InvalidBufferSize(usize),
    #[error("failed to parse patch: {0}")]
    Patch(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio device error: {0}")]
    AudioDevice(String),
}

pub type Result<T> = std::result::Result<T, Error>;
