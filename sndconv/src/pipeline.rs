//! Conversion pipeline
//!
//! Drives one conversion from an opened demuxer to a finalized WAV file:
//!
//! 1. pick the first audio stream
//! 2. build its decoder and the sample converter (decoding up to the first
//!    frame when the container does not declare a channel count)
//! 3. open the output and write the provisional header
//! 4. packet loop: decode → convert → append
//! 5. flush the converter, finalize the header
//!
//! Everything that can reject the input happens before the output is
//! opened, so a structurally bad input never leaves a file behind.
//! Per-packet decode failures and per-frame conversion failures are logged
//! and skipped; the output then holds every frame that did convert.

use crate::audio::decoder::{drain, FrameDecoder};
use crate::audio::demux::{Demuxer, MediaKind, RawWavDemuxer, SymphoniaDemuxer};
use crate::audio::resampler::{FlushPolicy, SampleConverter};
use crate::audio::types::{
    ChannelLayout, ConvertedChunk, PacketBuffer, PcmFrame, StreamDescriptor,
};
use crate::audio::wav::WavWriter;
use crate::config::ConversionOptions;
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// Counters for one completed conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    /// Source stream that was converted
    pub stream: StreamDescriptor,
    /// Packets read from the demuxer (all streams)
    pub packets_read: u64,
    /// Packets belonging to other streams
    pub packets_skipped: u64,
    pub frames_decoded: u64,
    /// Packets that failed to decode
    pub decode_errors: u64,
    /// Frames that failed to convert
    pub conversion_errors: u64,
    /// PCM bytes in the output data chunk
    pub data_bytes: u64,
}

impl ConversionReport {
    fn new(stream: StreamDescriptor) -> Self {
        Self {
            stream,
            packets_read: 0,
            packets_skipped: 0,
            frames_decoded: 0,
            decode_errors: 0,
            conversion_errors: 0,
            data_bytes: 0,
        }
    }
}

/// Conversion driver
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: ConversionOptions,
}

impl Pipeline {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert any container/codec symphonia can read
    pub fn convert_sound(&self, input: &Path, output: &Path) -> Result<ConversionReport> {
        info!("Converting {} -> {}", input.display(), output.display());
        let demuxer = SymphoniaDemuxer::open(input)?;
        self.run(demuxer, || create_output(output))
    }

    /// Convert a canonical 44-byte-header PCM WAV file
    pub fn resample_wave(&self, input: &Path, output: &Path) -> Result<ConversionReport> {
        info!("Resampling {} -> {}", input.display(), output.display());
        let demuxer = RawWavDemuxer::open(input, self.options.wav_read_frames)?;
        self.run(demuxer, || create_output(output))
    }

    /// Run the conversion loop over `demuxer`.
    ///
    /// `open_output` is called only once the input has been accepted.
    pub fn run<D, W>(
        &self,
        mut demuxer: D,
        open_output: impl FnOnce() -> Result<W>,
    ) -> Result<ConversionReport>
    where
        D: Demuxer,
        W: Write + Seek,
    {
        let stream = demuxer
            .streams()
            .iter()
            .find(|s| s.kind == MediaKind::Audio)
            .cloned()
            .ok_or(Error::NoAudioStream)?;
        let mut descriptor = stream.descriptor.ok_or(Error::NoAudioStream)?;

        debug!(
            "Selected stream {} ({}): {} Hz, {} channel(s), {:?}",
            stream.index,
            stream.codec,
            descriptor.sample_rate,
            descriptor.channels,
            descriptor.sample_format
        );

        let mut decoder = demuxer.open_decoder(&stream)?;
        let mut report = ConversionReport::new(descriptor);

        // Containers may leave the channel count out; the decoder knows it
        let mut first_frame = None;
        let mut exhausted = false;
        if descriptor.channels == 0 {
            first_frame = first_decoded_frame(
                &mut demuxer,
                &mut *decoder,
                stream.index,
                &mut report,
                &mut exhausted,
            )?;
            let channels = first_frame
                .as_ref()
                .map_or(1, |frame| frame.planes().len() as u16);
            debug!("Stream declares no channel count, decoder reports {}", channels);
            descriptor.channels = channels;
            descriptor.layout = ChannelLayout::default_for(channels);
            report.stream = descriptor;
        }

        let mut converter =
            SampleConverter::configure(&descriptor, self.options.target, &self.options.converter)?;

        let mut writer = WavWriter::new(open_output()?, self.options.target);
        writer.write_header()?;

        if let Some(frame) = first_frame {
            convert_frame(&frame, &mut converter, &mut writer, &mut report)?;
            convert_available(&mut *decoder, &mut converter, &mut writer, &mut report)?;
        }

        while !exhausted {
            let Some(packet) = next_stream_packet(&mut demuxer, stream.index, &mut report) else {
                break;
            };

            if let Err(e) = decoder.submit(packet) {
                if !e.is_recoverable() {
                    return Err(e);
                }
                report.decode_errors += 1;
                warn!("Skipping packet: {}", e);
                continue;
            }

            convert_available(&mut *decoder, &mut converter, &mut writer, &mut report)?;
        }

        match self.options.converter.flush {
            FlushPolicy::Flush => match converter.flush() {
                Ok(tail) => append(&mut writer, &tail)?,
                Err(e) if e.is_recoverable() => {
                    report.conversion_errors += 1;
                    warn!("Dropping resampler tail: {}", e);
                }
                Err(e) => return Err(e),
            },
            FlushPolicy::Skip => debug!("Resampler flush skipped"),
        }

        writer.finalize()?;
        report.data_bytes = writer.bytes_written();

        info!(
            "Conversion complete: {} packets, {} frames, {} bytes of PCM ({} decode errors, {} conversion errors)",
            report.packets_read,
            report.frames_decoded,
            report.data_bytes,
            report.decode_errors,
            report.conversion_errors
        );
        Ok(report)
    }
}

/// Next packet of the selected stream, or None once the input ends.
///
/// A read error ends the stream like end of file.
fn next_stream_packet<D: Demuxer>(
    demuxer: &mut D,
    stream_index: u32,
    report: &mut ConversionReport,
) -> Option<PacketBuffer> {
    loop {
        let packet = match demuxer.next_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => return None,
            Err(e) => {
                warn!("Stopping at unreadable packet: {}", e);
                return None;
            }
        };
        report.packets_read += 1;

        if packet.stream_index() != stream_index {
            report.packets_skipped += 1;
            continue;
        }
        trace!("Packet ts={} ({} bytes)", packet.ts(), packet.len());
        return Some(packet);
    }
}

/// Decode until the first frame comes out, counting skipped packets.
///
/// Sets `exhausted` and returns None if the input ends first. Frames after
/// the first stay queued in the decoder.
fn first_decoded_frame<D>(
    demuxer: &mut D,
    decoder: &mut dyn FrameDecoder,
    stream_index: u32,
    report: &mut ConversionReport,
    exhausted: &mut bool,
) -> Result<Option<PcmFrame>>
where
    D: Demuxer,
{
    while let Some(packet) = next_stream_packet(demuxer, stream_index, report) {
        if let Err(e) = decoder.submit(packet) {
            if !e.is_recoverable() {
                return Err(e);
            }
            report.decode_errors += 1;
            warn!("Skipping packet: {}", e);
            continue;
        }

        loop {
            match decoder.receive() {
                Ok(Some(frame)) => {
                    report.frames_decoded += 1;
                    return Ok(Some(frame));
                }
                Ok(None) => break,
                Err(e) if e.is_recoverable() => {
                    report.decode_errors += 1;
                    warn!("Skipping undecodable frame: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }
    *exhausted = true;
    Ok(None)
}

/// Drain every frame the decoder has ready through the converter
fn convert_available<D, W>(
    decoder: &mut D,
    converter: &mut SampleConverter,
    writer: &mut WavWriter<W>,
    report: &mut ConversionReport,
) -> Result<()>
where
    D: FrameDecoder + ?Sized,
    W: Write + Seek,
{
    for frame in drain(decoder) {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) if e.is_recoverable() => {
                report.decode_errors += 1;
                warn!("Skipping undecodable frame: {}", e);
                continue;
            }
            Err(e) => return Err(e),
        };
        report.frames_decoded += 1;
        convert_frame(&frame, converter, writer, report)?;
    }
    Ok(())
}

fn convert_frame<W: Write + Seek>(
    frame: &PcmFrame,
    converter: &mut SampleConverter,
    writer: &mut WavWriter<W>,
    report: &mut ConversionReport,
) -> Result<()> {
    match converter.convert(frame) {
        Ok(chunk) => append(writer, &chunk),
        Err(e) if e.is_recoverable() => {
            report.conversion_errors += 1;
            warn!("Skipping frame of {} samples: {}", frame.frames(), e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn append<W: Write + Seek>(writer: &mut WavWriter<W>, chunk: &ConvertedChunk) -> Result<()> {
    if !chunk.is_empty() {
        writer.append(chunk)?;
    }
    Ok(())
}

fn create_output(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| Error::OutputOpen {
            path: path.to_path_buf(),
            source,
        })
}

/// Convert `input` (any supported container) to 8 kHz mono 16-bit WAV
pub fn convert_sound(input: &Path, output: &Path) -> Result<ConversionReport> {
    Pipeline::default().convert_sound(input, output)
}

/// Convert a canonical PCM WAV file to 8 kHz mono 16-bit WAV
pub fn resample_wave(input: &Path, output: &Path) -> Result<ConversionReport> {
    Pipeline::default().resample_wave(input, output)
}
