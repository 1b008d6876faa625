//! Core audio data types
//!
//! Defines the structures that flow through the conversion pipeline:
//! demuxer → `PacketBuffer` → decoder → `PcmFrame` → converter →
//! `ConvertedChunk` → WAV writer.

use symphonia::core::sample::SampleFormat as SymphoniaSampleFormat;

/// Source sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    U16,
    U24,
    U32,
    S8,
    S16,
    S24,
    S32,
    F32,
    F64,
}

impl SampleFormat {
    /// Size of one sample of one channel in bytes
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::S8 => 1,
            SampleFormat::U16 | SampleFormat::S16 => 2,
            SampleFormat::U24 | SampleFormat::S24 => 3,
            SampleFormat::U32 | SampleFormat::S32 | SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }

    /// Map a WAVE `fmt ` chunk (format tag + bit depth) onto a sample format
    ///
    /// Format tag 1 is integer PCM (8-bit is unsigned per the RIFF convention),
    /// format tag 3 is IEEE float.
    pub fn from_wav(format_tag: u16, bits_per_sample: u16) -> Option<Self> {
        match (format_tag, bits_per_sample) {
            (1, 8) => Some(SampleFormat::U8),
            (1, 16) => Some(SampleFormat::S16),
            (1, 24) => Some(SampleFormat::S24),
            (1, 32) => Some(SampleFormat::S32),
            (3, 32) => Some(SampleFormat::F32),
            (3, 64) => Some(SampleFormat::F64),
            _ => None,
        }
    }
}

impl From<SymphoniaSampleFormat> for SampleFormat {
    fn from(format: SymphoniaSampleFormat) -> Self {
        match format {
            SymphoniaSampleFormat::U8 => SampleFormat::U8,
            SymphoniaSampleFormat::U16 => SampleFormat::U16,
            SymphoniaSampleFormat::U24 => SampleFormat::U24,
            SymphoniaSampleFormat::U32 => SampleFormat::U32,
            SymphoniaSampleFormat::S8 => SampleFormat::S8,
            SymphoniaSampleFormat::S16 => SampleFormat::S16,
            SymphoniaSampleFormat::S24 => SampleFormat::S24,
            SymphoniaSampleFormat::S32 => SampleFormat::S32,
            SymphoniaSampleFormat::F32 => SampleFormat::F32,
            SymphoniaSampleFormat::F64 => SampleFormat::F64,
        }
    }
}

/// Whether channels are interleaved in one buffer or stored one plane each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    Packed,
    Planar,
}

/// Channel arrangement of a source stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo,
    /// Any layout with more than two channels
    Multi(u16),
}

impl ChannelLayout {
    /// Default layout for a channel count (None for zero channels)
    pub fn default_for(channels: u16) -> Option<Self> {
        match channels {
            0 => None,
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            n => Some(ChannelLayout::Multi(n)),
        }
    }

    pub fn channel_count(self) -> u16 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Multi(n) => n,
        }
    }
}

/// Source audio characteristics discovered from the input
///
/// Immutable once built; consumed by `SampleConverter::configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Channel layout (derived from the count when the input does not say)
    pub layout: Option<ChannelLayout>,
    /// Sample encoding
    pub sample_format: SampleFormat,
    /// Interleaved or planar storage
    pub packing: Packing,
}

impl StreamDescriptor {
    /// Build a descriptor with the default layout for `channels`
    pub fn new(
        sample_rate: u32,
        channels: u16,
        sample_format: SampleFormat,
        packing: Packing,
    ) -> Self {
        Self {
            sample_rate,
            channels,
            layout: ChannelLayout::default_for(channels),
            sample_format,
            packing,
        }
    }
}

/// Fixed output format: mono, signed 16-bit packed PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl TargetFormat {
    /// 8 kHz mono 16-bit, the only output format this crate produces
    pub const TELEPHONY: TargetFormat = TargetFormat {
        sample_rate: 8000,
        channels: 1,
        bits_per_sample: 16,
    };

    /// Bytes per second of output audio
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    /// Bytes per sample frame (all channels)
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }
}

impl Default for TargetFormat {
    fn default() -> Self {
        TargetFormat::TELEPHONY
    }
}

/// Compressed bytes of one demuxed packet
///
/// Moved into the decoder by `FrameDecoder::submit` and dropped there.
#[derive(Debug, Clone)]
pub struct PacketBuffer {
    stream_index: u32,
    ts: u64,
    dur: u64,
    data: Box<[u8]>,
}

impl PacketBuffer {
    pub fn new(stream_index: u32, ts: u64, dur: u64, data: Box<[u8]>) -> Self {
        Self {
            stream_index,
            ts,
            dur,
            data,
        }
    }

    /// Index of the stream this packet belongs to
    pub fn stream_index(&self) -> u32 {
        self.stream_index
    }

    /// Presentation timestamp in stream time base units
    pub fn ts(&self) -> u64 {
        self.ts
    }

    /// Duration in stream time base units
    pub fn dur(&self) -> u64 {
        self.dur
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn into_data(self) -> Box<[u8]> {
        self.data
    }
}

/// Decoded PCM samples in the source layout
///
/// Samples are normalized to `f32` in `[-1.0, 1.0]` and stored one plane per
/// channel. All planes have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmFrame {
    planes: Vec<Vec<f32>>,
}

impl PcmFrame {
    /// Build a frame from per-channel planes
    ///
    /// Planes are truncated to the shortest one so every channel has the
    /// same number of samples.
    pub fn from_planes(mut planes: Vec<Vec<f32>>) -> Self {
        let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
        for plane in &mut planes {
            plane.truncate(frames);
        }
        Self { planes }
    }

    /// Build a frame from interleaved samples [c0, c1, c0, c1, ...]
    pub fn from_interleaved(samples: &[f32], channels: usize) -> Self {
        if channels == 0 {
            return Self { planes: Vec::new() };
        }

        let frames = samples.len() / channels;
        let mut planes = vec![Vec::with_capacity(frames); channels];
        for frame in samples.chunks_exact(channels) {
            for (plane, &sample) in planes.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        Self { planes }
    }

    /// Number of samples per channel
    pub fn frames(&self) -> usize {
        self.planes.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn planes(&self) -> &[Vec<f32>] {
        &self.planes
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}

/// Little-endian s16 bytes in the target format
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertedChunk {
    bytes: Vec<u8>,
}

impl ConvertedChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of 16-bit output samples
    pub fn sample_count(&self) -> usize {
        self.bytes.len() / 2
    }
}
