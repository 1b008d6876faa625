//! Sample format conversion using rubato
//!
//! Converts decoded PCM frames of any rate, sample format and channel count
//! into mono signed 16-bit samples at the target rate.
//!
//! The converter is stateful: input that does not fill a whole resampler
//! chunk is kept as pending input, and the resampler's own delay line
//! persists between calls. Nothing is flushed mid-stream. `flush()` drains
//! what is left at end of stream.

use crate::audio::types::{ConvertedChunk, PcmFrame, StreamDescriptor, TargetFormat};
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::{debug, trace, warn};

/// Highest source channel count accepted for down-mixing
pub const MAX_CHANNELS: u16 = 32;

/// What to do with samples still inside the resampler at end of stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Drain pending input and the delay line so no trailing audio is lost
    #[default]
    Flush,
    /// Leave them behind (output ends up to one resampler chunk short)
    Skip,
}

/// Converter tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterOptions {
    /// Input frames per resampler call
    pub chunk_frames: usize,
    /// End-of-stream behaviour
    pub flush: FlushPolicy,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            chunk_frames: 512,
            flush: FlushPolicy::Flush,
        }
    }
}

/// Stateful converter from a source stream to the target format.
///
/// Owned by the pipeline for the lifetime of one conversion; independent
/// conversions each hold their own converter.
pub struct SampleConverter {
    source: StreamDescriptor,
    target: TargetFormat,
    ratio: f64,

    /// None when source and target rates match
    resampler: Option<FastFixedIn<f32>>,

    /// Mono input not yet consumed by the resampler
    pending: Vec<f32>,
    /// Resampler output plane, sized once for the largest chunk
    out_plane: Vec<Vec<f32>>,
    /// Mono output of the current call, reused between calls
    scratch: Vec<f32>,
    /// Quantized output of the current call, reused between calls
    pcm: Vec<i16>,

    /// Leading output samples still to discard (resampler latency)
    delay_remaining: usize,

    frames_in: u64,
    samples_out: u64,
    flushed: bool,
}

impl SampleConverter {
    /// Configure a converter for `source` → `target`.
    ///
    /// # Errors
    /// - `UnsupportedFormat` if the source rate is zero, the channel count is
    ///   zero or above `MAX_CHANNELS`, the layout disagrees with the count,
    ///   or the target is not mono 16-bit
    /// - `Allocation` if the resampler cannot be created
    pub fn configure(
        source: &StreamDescriptor,
        target: TargetFormat,
        options: &ConverterOptions,
    ) -> Result<Self> {
        if source.sample_rate == 0 {
            return Err(Error::UnsupportedFormat(
                "source sample rate is zero".to_string(),
            ));
        }
        if source.channels == 0 || source.channels > MAX_CHANNELS {
            return Err(Error::UnsupportedFormat(format!(
                "{} source channels (supported: 1-{})",
                source.channels, MAX_CHANNELS
            )));
        }
        match source.layout {
            Some(layout) if layout.channel_count() == source.channels => {}
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    "channel layout {:?} does not match {} channels",
                    other, source.channels
                )));
            }
        }
        if target.channels != 1 || target.bits_per_sample != 16 || target.sample_rate == 0 {
            return Err(Error::UnsupportedFormat(format!(
                "target {:?} is not mono 16-bit PCM",
                target
            )));
        }

        if options.chunk_frames == 0 {
            return Err(Error::Allocation(
                "resampler chunk size must be greater than zero".to_string(),
            ));
        }

        let ratio = target.sample_rate as f64 / source.sample_rate as f64;

        let (resampler, out_plane, delay) = if source.sample_rate == target.sample_rate {
            debug!(
                "Sample rate already at {}Hz, converter is pass-through",
                target.sample_rate
            );
            (None, Vec::new(), 0)
        } else {
            let resampler = FastFixedIn::<f32>::new(
                ratio,
                1.0, // max_relative_ratio (no runtime changes)
                PolynomialDegree::Septic,
                options.chunk_frames,
                1,
            )
            .map_err(|e| Error::Allocation(format!("Failed to create resampler: {}", e)))?;

            let out_plane = vec![vec![0.0f32; resampler.output_frames_max()]];
            let delay = resampler.output_delay();

            debug!(
                "Resampler configured: {}Hz -> {}Hz, chunk {} frames, delay {} frames",
                source.sample_rate, target.sample_rate, options.chunk_frames, delay
            );
            (Some(resampler), out_plane, delay)
        };

        Ok(Self {
            source: *source,
            target,
            ratio,
            resampler,
            pending: Vec::new(),
            out_plane,
            scratch: Vec::new(),
            pcm: Vec::new(),
            delay_remaining: delay,
            frames_in: 0,
            samples_out: 0,
            flushed: false,
        })
    }

    /// Convert one decoded frame.
    ///
    /// The returned chunk can be shorter than `frames * ratio`, or empty,
    /// while the resampler is still filling its first chunk.
    ///
    /// # Errors
    /// `Conversion` if the resampler rejects the data or the converter was
    /// already flushed. No bytes are returned for a failed frame.
    pub fn convert(&mut self, frame: &PcmFrame) -> Result<ConvertedChunk> {
        if self.flushed {
            return Err(Error::Conversion(
                "converter already flushed at end of stream".to_string(),
            ));
        }

        let frames = frame.frames();
        self.frames_in += frames as u64;
        self.scratch.clear();

        if self.resampler.is_none() {
            Self::downmix_into(frame, &mut self.scratch);
            return Ok(self.emit());
        }

        Self::downmix_into(frame, &mut self.pending);

        // Output upper bound; allocated on first use, reused afterwards
        let bound = (self.pending.len() as f64 * self.ratio).ceil() as usize;
        self.scratch.reserve(bound);

        let result = self.run_full_chunks();
        match result {
            Ok(()) => {
                trace!(
                    "Converted {} frames -> {} samples ({} pending)",
                    frames,
                    self.scratch.len(),
                    self.pending.len()
                );
                Ok(self.emit())
            }
            Err(e) => {
                self.scratch.clear();
                Err(e)
            }
        }
    }

    /// Drain pending input and the resampler delay line.
    ///
    /// Emits exactly the samples still owed so the total output equals
    /// `round(frames_in * ratio)`. Returns an empty chunk for pass-through
    /// converters and on repeated calls.
    pub fn flush(&mut self) -> Result<ConvertedChunk> {
        self.scratch.clear();
        if self.flushed {
            return Ok(ConvertedChunk::default());
        }
        self.flushed = true;

        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(ConvertedChunk::default());
        };

        let expected_total = (self.frames_in as f64 * self.ratio).round() as u64;
        let owed = expected_total.saturating_sub(self.samples_out) as usize;

        // One chunk of input (or zero padding) per pass
        let chunk = resampler.input_frames_max().max(1);
        let input_needed = self.pending.len() as f64
            + (self.delay_remaining + owed + 2) as f64 / self.ratio;
        let max_passes = (input_needed / chunk as f64).ceil() as usize + 2;

        let mut passes = 0;
        while self.scratch.len() < owed && passes < max_passes {
            let result = if self.pending.is_empty() {
                let no_input: Option<&[&[f32]]> = None;
                resampler.process_partial_into_buffer(no_input, &mut self.out_plane[..], None)
            } else {
                let input: [&[f32]; 1] = [&self.pending[..]];
                resampler.process_partial_into_buffer(
                    Some(&input[..]),
                    &mut self.out_plane[..],
                    None,
                )
            };
            let (frames_read, frames_written) = result
                .map_err(|e| Error::Conversion(format!("Resampler flush failed: {}", e)))?;

            self.pending.drain(..frames_read.min(self.pending.len()));
            Self::take_output(
                &self.out_plane[0][..frames_written],
                &mut self.delay_remaining,
                &mut self.scratch,
            );
            passes += 1;
        }
        if self.scratch.len() < owed {
            warn!(
                "Resampler drained {} of {} trailing samples after {} passes",
                self.scratch.len(),
                owed,
                passes
            );
        }
        self.scratch.truncate(owed);

        debug!(
            "Flushed resampler: {} trailing samples ({} total)",
            self.scratch.len(),
            self.samples_out + self.scratch.len() as u64
        );
        Ok(self.emit())
    }

    pub fn source(&self) -> &StreamDescriptor {
        &self.source
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    /// Target rate divided by source rate
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn is_pass_through(&self) -> bool {
        self.resampler.is_none()
    }

    /// Source frames accepted so far
    pub fn frames_in(&self) -> u64 {
        self.frames_in
    }

    /// Output samples emitted so far
    pub fn samples_out(&self) -> u64 {
        self.samples_out
    }

    /// Feed every complete resampler chunk held in `pending`
    fn run_full_chunks(&mut self) -> Result<()> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(());
        };

        let mut consumed = 0;
        let mut outcome = Ok(());
        while self.pending.len() - consumed >= resampler.input_frames_next() {
            let input: [&[f32]; 1] = [&self.pending[consumed..]];
            match resampler.process_into_buffer(&input[..], &mut self.out_plane[..], None) {
                Ok((frames_read, frames_written)) => {
                    consumed += frames_read;
                    Self::take_output(
                        &self.out_plane[0][..frames_written],
                        &mut self.delay_remaining,
                        &mut self.scratch,
                    );
                }
                Err(e) => {
                    outcome = Err(Error::Conversion(format!("Resampling failed: {}", e)));
                    break;
                }
            }
        }

        self.pending.drain(..consumed);
        outcome
    }

    /// Append resampler output, discarding the latency prefix
    fn take_output(output: &[f32], delay_remaining: &mut usize, dest: &mut Vec<f32>) {
        let skip = (*delay_remaining).min(output.len());
        *delay_remaining -= skip;
        dest.extend_from_slice(&output[skip..]);
    }

    /// Average all channels of `frame` into `dest`
    fn downmix_into(frame: &PcmFrame, dest: &mut Vec<f32>) {
        let planes = frame.planes();
        match planes.len() {
            0 => {}
            1 => dest.extend_from_slice(&planes[0]),
            channels => {
                let scale = 1.0 / channels as f32;
                dest.reserve(frame.frames());
                for idx in 0..frame.frames() {
                    let sum: f32 = planes.iter().map(|plane| plane[idx]).sum();
                    dest.push(sum * scale);
                }
            }
        }
    }

    /// Quantize `scratch` to little-endian s16 bytes
    fn emit(&mut self) -> ConvertedChunk {
        self.pcm.clear();
        self.pcm.extend(self.scratch.iter().map(|&s| quantize(s)));
        self.samples_out += self.pcm.len() as u64;

        let mut bytes = vec![0u8; self.pcm.len() * 2];
        LittleEndian::write_i16_into(&self.pcm, &mut bytes);
        ConvertedChunk::new(bytes)
    }
}

/// Normalized float to s16, rounding to nearest and clamping
fn quantize(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}
