//! Error types for sndconv
//!
//! Per-packet and per-frame failures (`Decode`, `Conversion`) are recoverable:
//! the pipeline logs them and moves on. Everything else aborts the run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the conversion library
#[derive(Error, Debug)]
pub enum Error {
    /// Input cannot be opened, probed or parsed
    #[error("Failed to open input: {0}")]
    Open(String),

    /// Input contains no audio stream
    #[error("No audio stream found in input")]
    NoAudioStream,

    /// No decoder registered for the stream's codec
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Source format cannot be mapped onto the target format
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Core conversion state could not be created
    #[error("Allocation failure: {0}")]
    Allocation(String),

    /// Output destination cannot be created
    #[error("Failed to create output {path}: {source}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A packet failed to decode
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// A frame failed to convert
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Header write, append, seek or finalize failure
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not allowed in the writer's current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] sndconv_common::Error),
}

impl Error {
    /// True for errors that only affect a single packet or frame
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Conversion(_))
    }
}

/// Convenience Result type using the sndconv Error
pub type Result<T> = std::result::Result<T, Error>;
