//! Packet decoding
//!
//! A `FrameDecoder` accepts one compressed packet at a time through
//! `submit()` and hands back zero or more PCM frames through `receive()`.
//! `drain()` wraps the receive side in an iterator so the pipeline can
//! write `for frame in drain(&mut decoder)`.
//!
//! Two implementations:
//! - `SymphoniaDecoder` for every codec symphonia ships (MP3, FLAC, AAC,
//!   Vorbis, PCM, ADPCM)
//! - `PcmDecoder` for raw little-endian PCM from a canonical WAV file

use crate::audio::types::{PacketBuffer, PcmFrame, SampleFormat, StreamDescriptor};
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::VecDeque;
use std::iter::FusedIterator;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::Packet;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Send-packet / receive-frame decoder interface
pub trait FrameDecoder {
    /// Hand one packet to the decoder
    ///
    /// # Errors
    /// `Decode` if the packet is corrupt. The decoder stays usable.
    fn submit(&mut self, packet: PacketBuffer) -> Result<()>;

    /// Next decoded frame, or `None` when nothing is available right now
    fn receive(&mut self) -> Result<Option<PcmFrame>>;

    /// Drop buffered frames and internal codec state
    fn reset(&mut self);
}

impl<D: FrameDecoder + ?Sized> FrameDecoder for Box<D> {
    fn submit(&mut self, packet: PacketBuffer) -> Result<()> {
        (**self).submit(packet)
    }

    fn receive(&mut self) -> Result<Option<PcmFrame>> {
        (**self).receive()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Iterator over the frames currently available from a decoder.
///
/// Ends when the decoder has nothing more to give. An error is yielded
/// once, after which the iterator is exhausted.
pub struct Drain<'a, D: FrameDecoder + ?Sized> {
    decoder: &'a mut D,
    done: bool,
}

/// Pull every frame the decoder can produce for the packets submitted so far
pub fn drain<D: FrameDecoder + ?Sized>(decoder: &mut D) -> Drain<'_, D> {
    Drain {
        decoder,
        done: false,
    }
}

impl<D: FrameDecoder + ?Sized> Iterator for Drain<'_, D> {
    type Item = Result<PcmFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.decoder.receive() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<D: FrameDecoder + ?Sized> FusedIterator for Drain<'_, D> {}

/// Decoder backed by symphonia's default codec registry
pub struct SymphoniaDecoder {
    inner: Box<dyn Decoder>,
    codec_name: &'static str,
    ready: VecDeque<PcmFrame>,
}

impl SymphoniaDecoder {
    /// Instantiate the registered decoder for `params`
    ///
    /// # Errors
    /// `UnsupportedCodec` if no decoder is registered for the codec.
    pub fn new(params: &CodecParameters) -> Result<Self> {
        let codec_name = codec_short_name(params);

        let inner = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| Error::UnsupportedCodec(format!("{}: {}", codec_name, e)))?;

        debug!("Created {} decoder", codec_name);
        Ok(Self {
            inner,
            codec_name,
            ready: VecDeque::new(),
        })
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec_name
    }
}

impl FrameDecoder for SymphoniaDecoder {
    fn submit(&mut self, packet: PacketBuffer) -> Result<()> {
        let (track_id, ts, dur) = (packet.stream_index(), packet.ts(), packet.dur());
        let packet = Packet::new_from_boxed_slice(track_id, ts, dur, packet.into_data());

        // Copy out of the decoder-owned buffer before touching the decoder again
        let decoded = self
            .inner
            .decode(&packet)
            .map(|buf| (buf.frames() > 0).then(|| planes_from_buffer(&buf)));

        match decoded {
            Ok(Some(planes)) => {
                self.ready.push_back(PcmFrame::from_planes(planes));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(SymphoniaError::ResetRequired) => {
                self.inner.reset();
                Err(Error::Decode(format!(
                    "{} decoder required a reset at ts {}",
                    self.codec_name, ts
                )))
            }
            Err(e) => Err(Error::Decode(format!(
                "{} packet at ts {}: {}",
                self.codec_name, ts, e
            ))),
        }
    }

    fn receive(&mut self) -> Result<Option<PcmFrame>> {
        Ok(self.ready.pop_front())
    }

    fn reset(&mut self) {
        self.ready.clear();
        self.inner.reset();
    }
}

/// Short codec name for log and error messages
pub fn codec_short_name(params: &CodecParameters) -> &'static str {
    symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name)
        .unwrap_or("unknown")
}

/// Split a symphonia buffer into normalized f32 planes
fn planes_from_buffer(decoded: &AudioBufferRef) -> Vec<Vec<f32>> {
    fn planes<S: Sample>(buf: &AudioBuffer<S>) -> Vec<Vec<f32>>
    where
        f32: FromSample<S>,
    {
        (0..buf.spec().channels.count())
            .map(|ch| buf.chan(ch).iter().map(|&s| f32::from_sample(s)).collect())
            .collect()
    }

    match decoded {
        AudioBufferRef::U8(buf) => planes(&**buf),
        AudioBufferRef::U16(buf) => planes(&**buf),
        AudioBufferRef::U24(buf) => planes(&**buf),
        AudioBufferRef::U32(buf) => planes(&**buf),
        AudioBufferRef::S8(buf) => planes(&**buf),
        AudioBufferRef::S16(buf) => planes(&**buf),
        AudioBufferRef::S24(buf) => planes(&**buf),
        AudioBufferRef::S32(buf) => planes(&**buf),
        AudioBufferRef::F32(buf) => planes(&**buf),
        AudioBufferRef::F64(buf) => planes(&**buf),
    }
}

/// Decoder for packed little-endian PCM
///
/// Each packet is decoded synchronously into exactly one frame (or none for
/// a packet shorter than one sample frame).
pub struct PcmDecoder {
    format: SampleFormat,
    channels: usize,
    ready: Option<PcmFrame>,
}

impl PcmDecoder {
    /// # Errors
    /// `UnsupportedFormat` if the descriptor has no channels.
    pub fn new(descriptor: &StreamDescriptor) -> Result<Self> {
        if descriptor.channels == 0 {
            return Err(Error::UnsupportedFormat(
                "PCM stream has no channels".to_string(),
            ));
        }

        Ok(Self {
            format: descriptor.sample_format,
            channels: descriptor.channels as usize,
            ready: None,
        })
    }

    /// Bytes per interleaved sample frame
    pub fn block_align(&self) -> usize {
        self.format.bytes_per_sample() * self.channels
    }
}

impl FrameDecoder for PcmDecoder {
    fn submit(&mut self, packet: PacketBuffer) -> Result<()> {
        let data = packet.data();
        let block_align = self.block_align();
        let whole = data.len() - data.len() % block_align;
        if whole != data.len() {
            warn!(
                "Dropping {} trailing bytes that do not form a whole {}-byte frame",
                data.len() - whole,
                block_align
            );
        }
        if whole == 0 {
            return Ok(());
        }

        let width = self.format.bytes_per_sample();
        let samples: Vec<f32> = data[..whole]
            .chunks_exact(width)
            .map(|bytes| decode_sample(self.format, bytes))
            .collect();

        self.ready = Some(PcmFrame::from_interleaved(&samples, self.channels));
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<PcmFrame>> {
        Ok(self.ready.take())
    }

    fn reset(&mut self) {
        self.ready = None;
    }
}

/// One little-endian sample to f32 in [-1.0, 1.0]
fn decode_sample(format: SampleFormat, bytes: &[u8]) -> f32 {
    match format {
        SampleFormat::U8 => (bytes[0] as f32 - 128.0) / 128.0,
        SampleFormat::S8 => bytes[0] as i8 as f32 / 128.0,
        SampleFormat::U16 => (LittleEndian::read_u16(bytes) as f32 - 32_768.0) / 32_768.0,
        SampleFormat::S16 => LittleEndian::read_i16(bytes) as f32 / 32_768.0,
        SampleFormat::U24 => (LittleEndian::read_u24(bytes) as f32 - 8_388_608.0) / 8_388_608.0,
        SampleFormat::S24 => LittleEndian::read_i24(bytes) as f32 / 8_388_608.0,
        SampleFormat::U32 => {
            ((LittleEndian::read_u32(bytes) as f64 - 2_147_483_648.0) / 2_147_483_648.0) as f32
        }
        SampleFormat::S32 => (LittleEndian::read_i32(bytes) as f64 / 2_147_483_648.0) as f32,
        SampleFormat::F32 => LittleEndian::read_f32(bytes),
        SampleFormat::F64 => LittleEndian::read_f64(bytes) as f32,
    }
}
