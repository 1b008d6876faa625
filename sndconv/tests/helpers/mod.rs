//! Test helper modules for sndconv integration tests
//!
//! - audio_generator: fixture WAV files with known content
//! - output reading and header checks

pub mod audio_generator;

pub use audio_generator::{
    generate_float_wav, generate_s24_wav, generate_silent_wav, generate_sine_wav,
    read_output, write_canonical_wav, OutputFile,
};
