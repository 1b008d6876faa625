//! # sndconv
//!
//! Converts audio files to 8 kHz mono signed 16-bit PCM WAV.
//!
//! **Pipeline:** demuxer → decoder → sample converter → WAV writer
//!
//! - Demuxing and decoding via symphonia (MP3, FLAC, AAC, M4A, Vorbis, WAV)
//! - Rate conversion via rubato, channel down-mix by averaging
//! - Streaming WAV output with a sentinel header patched on finalize
//!
//! ```ignore
//! let report = sndconv::convert_sound(Path::new("in.mp3"), Path::new("result.wav"))?;
//! println!("{} bytes of PCM", report.data_bytes);
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;

pub use config::ConversionOptions;
pub use error::{Error, Result};
pub use pipeline::{convert_sound, resample_wave, ConversionReport, Pipeline};
