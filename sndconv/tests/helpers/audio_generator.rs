//! Audio Test File Generation Utilities
//!
//! Generates deterministic WAV inputs with known characteristics and reads
//! conversion outputs back for verification:
//! - Silent audio (all zeros)
//! - Sine waves at any rate and channel count
//! - 24-bit integer and 32-bit float sources
//! - Hand-built canonical 44-byte-header files for the raw-WAV path

#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use hound::{WavReader, WavSpec, WavWriter};
use sndconv::audio::wav::{WavHeader, FORMAT_PCM};
use std::f32::consts::PI;
use std::path::Path;

fn frames_for(sample_rate: u32, duration_ms: u64) -> u64 {
    (sample_rate as u64 * duration_ms) / 1000
}

/// Generate a silent 16-bit WAV file
///
/// # Example
/// ```no_run
/// # use std::path::Path;
/// generate_silent_wav(Path::new("/tmp/silent_1s.wav"), 44100, 1, 1000)?;
/// # Ok::<(), hound::Error>(())
/// ```
pub fn generate_silent_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..frames_for(sample_rate, duration_ms) * channels as u64 {
        writer.write_sample(0i16)?;
    }
    writer.finalize()
}

/// Generate a 16-bit sine wave with the same signal on every channel
///
/// * `amplitude` - 0.0-1.0 (0.5 recommended to avoid clipping)
pub fn generate_sine_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
    frequency_hz: f32,
    amplitude: f32,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame_idx in 0..frames_for(sample_rate, duration_ms) {
        let t = frame_idx as f32 / sample_rate as f32;
        let sample = ((2.0 * PI * frequency_hz * t).sin() * amplitude * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()
}

/// Generate a 24-bit mono sine wave
pub fn generate_s24_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };

    let max = (1 << 23) - 1;
    let mut writer = WavWriter::create(path, spec)?;
    for frame_idx in 0..frames_for(sample_rate, duration_ms) {
        let t = frame_idx as f32 / sample_rate as f32;
        writer.write_sample(((2.0 * PI * 440.0 * t).sin() * 0.5 * max as f32) as i32)?;
    }
    writer.finalize()
}

/// Generate a 32-bit float sine wave
pub fn generate_float_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for frame_idx in 0..frames_for(sample_rate, duration_ms) {
        let t = frame_idx as f32 / sample_rate as f32;
        let sample = (2.0 * PI * 300.0 * t).sin() * 0.25;
        for _ in 0..channels {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()
}

/// Write a canonical 44-byte-header 16-bit PCM file from interleaved samples
pub fn write_canonical_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    channels: u16,
    samples: &[i16],
) -> std::io::Result<()> {
    let data_size = (samples.len() * 2) as u32;
    let header = WavHeader {
        riff_size: data_size + 36,
        format_tag: FORMAT_PCM,
        channels,
        sample_rate,
        byte_rate: sample_rate * channels as u32 * 2,
        block_align: channels * 2,
        bits_per_sample: 16,
        data_size,
    };

    let mut bytes = header.encode().to_vec();
    let mut data = vec![0u8; samples.len() * 2];
    LittleEndian::write_i16_into(samples, &mut data);
    bytes.extend_from_slice(&data);
    std::fs::write(path, bytes)
}

/// A conversion output read back from disk
pub struct OutputFile {
    pub spec: WavSpec,
    pub samples: Vec<i16>,
    /// Raw file contents, header included
    pub bytes: Vec<u8>,
}

impl OutputFile {
    pub fn riff_size(&self) -> u32 {
        LittleEndian::read_u32(&self.bytes[4..8])
    }

    pub fn data_size(&self) -> u32 {
        LittleEndian::read_u32(&self.bytes[40..44])
    }

    /// RIFF = total - 8, data = total - 44
    pub fn assert_header_consistent(&self) {
        assert_eq!(self.riff_size() as usize, self.bytes.len() - 8);
        assert_eq!(self.data_size() as usize, self.bytes.len() - 44);
        assert_eq!(self.samples.len() * 2, self.bytes.len() - 44);
    }
}

/// Read an output file with hound and as raw bytes
pub fn read_output<P: AsRef<Path>>(path: P) -> OutputFile {
    let bytes = std::fs::read(path.as_ref()).expect("output file should exist");
    let mut reader = WavReader::open(path.as_ref()).expect("output should be a readable WAV");
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .expect("output samples should be 16-bit");

    OutputFile {
        spec,
        samples,
        bytes,
    }
}
