//! Container demuxing
//!
//! A `Demuxer` lists the streams of an opened input, builds a decoder for
//! one of them and yields packets in file order until end of stream.

use crate::audio::decoder::{codec_short_name, FrameDecoder, PcmDecoder, SymphoniaDecoder};
use crate::audio::types::{
    ChannelLayout, PacketBuffer, Packing, SampleFormat, StreamDescriptor,
};
use crate::audio::wav::{WavHeader, HEADER_LEN};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Kind of elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Other,
}

/// One stream of an opened input
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index, matches `PacketBuffer::stream_index`
    pub index: u32,
    pub kind: MediaKind,
    /// Audio parameters (None for non-audio streams)
    pub descriptor: Option<StreamDescriptor>,
    /// Codec short name
    pub codec: String,
}

/// Packet source for the conversion pipeline
pub trait Demuxer {
    /// All streams in container order
    fn streams(&self) -> &[StreamInfo];

    /// Build a decoder for `stream`
    ///
    /// # Errors
    /// `UnsupportedCodec` if no decoder is registered for the stream's codec.
    fn open_decoder(&self, stream: &StreamInfo) -> Result<Box<dyn FrameDecoder>>;

    /// Next packet in file order, `None` at end of stream
    fn next_packet(&mut self) -> Result<Option<PacketBuffer>>;
}

/// Demuxer for every container symphonia can probe
pub struct SymphoniaDemuxer {
    format: Box<dyn FormatReader>,
    streams: Vec<StreamInfo>,
}

impl SymphoniaDemuxer {
    /// Open and probe `path`
    ///
    /// # Errors
    /// `Open` if the file cannot be opened or its container is not recognized.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Open(format!("{}: {}", path.display(), e)))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Open(format!("Failed to probe {}: {}", path.display(), e)))?;

        let format = probed.format;
        let streams: Vec<StreamInfo> = format
            .tracks()
            .iter()
            .map(|track| stream_info(track.id, &track.codec_params))
            .collect();

        debug!(
            "Opened {}: {} stream(s) {:?}",
            path.display(),
            streams.len(),
            streams.iter().map(|s| s.codec.as_str()).collect::<Vec<_>>()
        );

        Ok(Self { format, streams })
    }
}

/// Classify a track; audio means a real codec with a known sample rate
fn stream_info(index: u32, params: &CodecParameters) -> StreamInfo {
    let codec = codec_short_name(params).to_string();

    let descriptor = match params.sample_rate {
        Some(sample_rate) if params.codec != CODEC_TYPE_NULL => {
            // 0 when undeclared; the pipeline takes it from the first frame
            let channels = params.channels.map(|c| c.count() as u16).unwrap_or(0);
            Some(StreamDescriptor {
                sample_rate,
                channels,
                layout: ChannelLayout::default_for(channels),
                // Compressed codecs do not declare one; they decode to float
                sample_format: params
                    .sample_format
                    .map(SampleFormat::from)
                    .unwrap_or(SampleFormat::F32),
                packing: Packing::Planar,
            })
        }
        _ => None,
    };

    StreamInfo {
        index,
        kind: if descriptor.is_some() {
            MediaKind::Audio
        } else {
            MediaKind::Other
        },
        descriptor,
        codec,
    }
}

impl Demuxer for SymphoniaDemuxer {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn open_decoder(&self, stream: &StreamInfo) -> Result<Box<dyn FrameDecoder>> {
        let track = self
            .format
            .tracks()
            .iter()
            .find(|t| t.id == stream.index)
            .ok_or_else(|| Error::UnsupportedCodec(format!("no track {}", stream.index)))?;

        Ok(Box::new(SymphoniaDecoder::new(&track.codec_params)?))
    }

    fn next_packet(&mut self) -> Result<Option<PacketBuffer>> {
        match self.format.next_packet() {
            Ok(packet) => {
                let (track_id, ts, dur) = (packet.track_id(), packet.ts, packet.dur);
                Ok(Some(PacketBuffer::new(track_id, ts, dur, packet.data)))
            }
            Err(SymphoniaError::IoError(ref e)) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!("Reached end of file");
                Ok(None)
            }
            Err(SymphoniaError::ResetRequired) => {
                // Chained streams with new parameters are not followed
                debug!("Stream parameters changed, treating as end of stream");
                Ok(None)
            }
            Err(SymphoniaError::IoError(e)) => Err(Error::Io(e)),
            Err(e) => Err(Error::Decode(format!("Failed to read packet: {}", e))),
        }
    }
}

/// Demuxer for canonical 44-byte-header WAV files
///
/// Reads the data chunk in packets of a fixed number of frames. A data size
/// that is the writer's sentinel, or larger than the file, means "read to
/// end of file".
pub struct RawWavDemuxer {
    reader: BufReader<File>,
    header: WavHeader,
    streams: Vec<StreamInfo>,
    /// Data bytes left, None when reading to end of file
    remaining: Option<u64>,
    block_align: usize,
    packet_bytes: usize,
    next_ts: u64,
}

impl RawWavDemuxer {
    /// # Errors
    /// - `Open` if the file cannot be read or the header is not canonical
    /// - `UnsupportedFormat` if the format tag / bit depth is not plain PCM
    pub fn open(path: &Path, read_frames: usize) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Open(format!("{}: {}", path.display(), e)))?;
        let file_len = file.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        let mut reader = BufReader::new(file);

        let mut buf = [0u8; HEADER_LEN];
        reader.read_exact(&mut buf).map_err(|e| {
            Error::Open(format!(
                "{}: cannot read {}-byte WAV header: {}",
                path.display(),
                HEADER_LEN,
                e
            ))
        })?;
        let header = WavHeader::parse(&buf)?;

        let sample_format = SampleFormat::from_wav(header.format_tag, header.bits_per_sample)
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!(
                    "WAV format tag {} with {} bits per sample",
                    header.format_tag, header.bits_per_sample
                ))
            })?;

        let expected_align = header.channels as usize * sample_format.bytes_per_sample();
        if header.block_align as usize != expected_align {
            warn!(
                "WAV block align {} disagrees with {} channels x {} bits, using {}",
                header.block_align, header.channels, header.bits_per_sample, expected_align
            );
        }

        let available = file_len.saturating_sub(HEADER_LEN as u64);
        let remaining = if header.is_provisional() || header.data_size as u64 > available {
            debug!("WAV data size {} not usable, reading to end of file", header.data_size);
            None
        } else {
            Some(header.data_size as u64)
        };

        let descriptor = StreamDescriptor::new(
            header.sample_rate,
            header.channels,
            sample_format,
            Packing::Packed,
        );
        debug!("Opened raw WAV {}: {:?}", path.display(), descriptor);

        Ok(Self {
            reader,
            header,
            streams: vec![StreamInfo {
                index: 0,
                kind: MediaKind::Audio,
                descriptor: Some(descriptor),
                codec: "pcm".to_string(),
            }],
            remaining,
            block_align: expected_align.max(1),
            packet_bytes: read_frames.max(1) * expected_align.max(1),
            next_ts: 0,
        })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }
}

impl Demuxer for RawWavDemuxer {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn open_decoder(&self, stream: &StreamInfo) -> Result<Box<dyn FrameDecoder>> {
        let descriptor = stream
            .descriptor
            .as_ref()
            .ok_or_else(|| Error::UnsupportedCodec(stream.codec.clone()))?;
        Ok(Box::new(PcmDecoder::new(descriptor)?))
    }

    fn next_packet(&mut self) -> Result<Option<PacketBuffer>> {
        let want = match self.remaining {
            Some(left) => (self.packet_bytes as u64).min(left),
            None => self.packet_bytes as u64,
        };
        if want == 0 {
            return Ok(None);
        }

        let mut data = Vec::with_capacity(want as usize);
        (&mut self.reader).take(want).read_to_end(&mut data)?;
        if data.is_empty() {
            return Ok(None);
        }

        if let Some(left) = self.remaining.as_mut() {
            *left -= data.len() as u64;
        }

        let frames = (data.len() / self.block_align) as u64;
        let ts = self.next_ts;
        self.next_ts += frames;

        Ok(Some(PacketBuffer::new(0, ts, frames, data.into_boxed_slice())))
    }
}
