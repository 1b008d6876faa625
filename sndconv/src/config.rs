//! sndconv run options

use crate::audio::resampler::{ConverterOptions, FlushPolicy};
use crate::audio::types::TargetFormat;
use sndconv_common::config::ConversionConfig;

/// Options for one conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    pub target: TargetFormat,
    pub converter: ConverterOptions,
    /// Frames per packet on the raw-WAV path
    pub wav_read_frames: usize,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

impl ConversionOptions {
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            target: TargetFormat::TELEPHONY,
            converter: ConverterOptions {
                chunk_frames: config.resampler_chunk_frames,
                flush: if config.flush_resampler {
                    FlushPolicy::Flush
                } else {
                    FlushPolicy::Skip
                },
            },
            wav_read_frames: config.wav_read_frames,
        }
    }

    /// Same options with a different end-of-stream policy
    pub fn with_flush(mut self, flush: FlushPolicy) -> Self {
        self.converter.flush = flush;
        self
    }
}
