//! Canonical 44-byte WAV container
//!
//! The writer streams PCM of unknown total length: it writes a provisional
//! header carrying sentinel sizes, appends data chunks as they arrive, and
//! on `finalize()` seeks back and patches the two size fields.
//!
//! Layout (all integers little-endian):
//!
//! | offset | field |
//! |---|---|
//! | 0 | `RIFF` |
//! | 4 | RIFF size (file length - 8) |
//! | 8 | `WAVE` |
//! | 12 | `fmt ` |
//! | 16 | fmt chunk length (16) |
//! | 20 | format tag |
//! | 22 | channels |
//! | 24 | sample rate |
//! | 28 | byte rate |
//! | 32 | block align |
//! | 34 | bits per sample |
//! | 36 | `data` |
//! | 40 | data size (file length - 44) |

use crate::audio::types::{ConvertedChunk, TargetFormat};
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use tracing::{debug, warn};

/// Length of the canonical header
pub const HEADER_LEN: usize = 44;

/// Size used in the provisional header (largest positive i32)
pub const SENTINEL_SIZE: u32 = 0x7FFF_FFFF;

/// Format tag for integer PCM
pub const FORMAT_PCM: u16 = 1;

/// Format tag for IEEE float samples
pub const FORMAT_IEEE_FLOAT: u16 = 3;

const FMT_CHUNK_LEN: u32 = 16;

/// Decoded contents of a canonical 44-byte WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Header written before the payload length is known
    pub fn provisional(target: TargetFormat) -> Self {
        Self {
            riff_size: SENTINEL_SIZE - 8,
            data_size: SENTINEL_SIZE - HEADER_LEN as u32,
            ..Self::for_target(target)
        }
    }

    /// Header for a payload of `data_bytes` bytes
    ///
    /// Sizes saturate at `u32::MAX` beyond the 4 GiB RIFF limit.
    pub fn finalized(target: TargetFormat, data_bytes: u64) -> Self {
        let total = data_bytes.saturating_add(HEADER_LEN as u64);
        Self {
            riff_size: u32::try_from(total - 8).unwrap_or(u32::MAX),
            data_size: u32::try_from(total - HEADER_LEN as u64).unwrap_or(u32::MAX),
            ..Self::for_target(target)
        }
    }

    fn for_target(target: TargetFormat) -> Self {
        Self {
            riff_size: 0,
            format_tag: FORMAT_PCM,
            channels: target.channels,
            sample_rate: target.sample_rate,
            byte_rate: target.byte_rate(),
            block_align: target.block_align(),
            bits_per_sample: target.bits_per_sample,
            data_size: 0,
        }
    }

    /// Serialize to the 44-byte on-disk layout
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(b"RIFF");
        LittleEndian::write_u32(&mut buf[4..8], self.riff_size);
        buf[8..12].copy_from_slice(b"WAVE");
        buf[12..16].copy_from_slice(b"fmt ");
        LittleEndian::write_u32(&mut buf[16..20], FMT_CHUNK_LEN);
        LittleEndian::write_u16(&mut buf[20..22], self.format_tag);
        LittleEndian::write_u16(&mut buf[22..24], self.channels);
        LittleEndian::write_u32(&mut buf[24..28], self.sample_rate);
        LittleEndian::write_u32(&mut buf[28..32], self.byte_rate);
        LittleEndian::write_u16(&mut buf[32..34], self.block_align);
        LittleEndian::write_u16(&mut buf[34..36], self.bits_per_sample);
        buf[36..40].copy_from_slice(b"data");
        LittleEndian::write_u32(&mut buf[40..44], self.data_size);
        buf
    }

    /// Parse a canonical header
    ///
    /// # Errors
    /// `Open` if the chunk identifiers are wrong or the `fmt ` chunk is not
    /// the plain 16-byte PCM form (the data chunk must start at byte 44).
    pub fn parse(buf: &[u8; HEADER_LEN]) -> Result<Self> {
        if &buf[0..4] != b"RIFF" || &buf[8..12] != b"WAVE" {
            return Err(Error::Open("not a RIFF/WAVE file".to_string()));
        }
        if &buf[12..16] != b"fmt " {
            return Err(Error::Open(
                "WAVE header does not start with a fmt chunk".to_string(),
            ));
        }
        let fmt_len = LittleEndian::read_u32(&buf[16..20]);
        if fmt_len != FMT_CHUNK_LEN {
            return Err(Error::Open(format!(
                "fmt chunk is {} bytes, expected {}",
                fmt_len, FMT_CHUNK_LEN
            )));
        }
        if &buf[36..40] != b"data" {
            return Err(Error::Open(
                "data chunk does not follow the fmt chunk".to_string(),
            ));
        }

        Ok(Self {
            riff_size: LittleEndian::read_u32(&buf[4..8]),
            format_tag: LittleEndian::read_u16(&buf[20..22]),
            channels: LittleEndian::read_u16(&buf[22..24]),
            sample_rate: LittleEndian::read_u32(&buf[24..28]),
            byte_rate: LittleEndian::read_u32(&buf[28..32]),
            block_align: LittleEndian::read_u16(&buf[32..34]),
            bits_per_sample: LittleEndian::read_u16(&buf[34..36]),
            data_size: LittleEndian::read_u32(&buf[40..44]),
        })
    }

    /// True while the size fields still hold the provisional sentinel values
    pub fn is_provisional(&self) -> bool {
        self.riff_size == SENTINEL_SIZE - 8 && self.data_size == SENTINEL_SIZE - HEADER_LEN as u32
    }
}

/// Writer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Nothing written yet
    Created,
    /// Provisional header on disk, accepting data
    Writing,
    /// Header patched with final sizes
    Finalized,
}

/// Size bookkeeping; never exposed outside the writer
#[derive(Debug, Clone, Copy)]
struct WavHeaderState {
    riff_size: u32,
    data_size: u32,
    running_total: u64,
}

/// Streaming WAV writer over a seekable sink.
///
/// # Examples
///
/// ```ignore
/// let mut writer = WavWriter::new(File::create("out.wav")?, TargetFormat::TELEPHONY);
/// writer.write_header()?;
/// writer.append(&chunk)?;
/// writer.finalize()?;
/// ```
pub struct WavWriter<W: Write + Seek> {
    sink: W,
    target: TargetFormat,
    state: WriterState,
    header: WavHeaderState,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(sink: W, target: TargetFormat) -> Self {
        let provisional = WavHeader::provisional(target);
        Self {
            sink,
            target,
            state: WriterState::Created,
            header: WavHeaderState {
                riff_size: provisional.riff_size,
                data_size: provisional.data_size,
                running_total: 0,
            },
        }
    }

    /// Write the provisional 44-byte header (Created → Writing)
    pub fn write_header(&mut self) -> Result<()> {
        if self.state != WriterState::Created {
            return Err(Error::InvalidState(format!(
                "header already written (state {:?})",
                self.state
            )));
        }

        self.sink.write_all(&self.current_header().encode())?;
        self.state = WriterState::Writing;
        debug!("Wrote provisional WAV header");
        Ok(())
    }

    /// Append one chunk of PCM bytes at end of file.
    ///
    /// Bytes accepted by the sink before a failure still count towards the
    /// running total.
    pub fn append(&mut self, chunk: &ConvertedChunk) -> Result<usize> {
        if self.state != WriterState::Writing {
            return Err(Error::InvalidState(format!(
                "cannot append in state {:?}",
                self.state
            )));
        }

        let bytes = chunk.as_bytes();
        let mut written = 0;
        while written < bytes.len() {
            match self.sink.write(&bytes[written..]) {
                Ok(0) => {
                    self.header.running_total += written as u64;
                    return Err(Error::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        format!("short write: {} of {} bytes", written, bytes.len()),
                    )));
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.header.running_total += written as u64;
                    return Err(Error::Io(e));
                }
            }
        }

        self.header.running_total += written as u64;
        Ok(written)
    }

    /// Seek back and patch the size fields (Writing → Finalized).
    ///
    /// Calling it again rewrites the identical header.
    pub fn finalize(&mut self) -> Result<()> {
        if self.state == WriterState::Created {
            return Err(Error::InvalidState(
                "cannot finalize before the header is written".to_string(),
            ));
        }

        let header = WavHeader::finalized(self.target, self.header.running_total);
        if self.header.running_total > (u32::MAX - 36) as u64 {
            warn!(
                "Payload of {} bytes exceeds the RIFF size limit, header sizes saturated",
                self.header.running_total
            );
        }
        self.header.riff_size = header.riff_size;
        self.header.data_size = header.data_size;

        self.sink.seek(SeekFrom::Start(0))?;
        self.sink.write_all(&header.encode())?;
        self.sink.seek(SeekFrom::End(0))?;
        self.sink.flush()?;

        self.state = WriterState::Finalized;
        debug!(
            "Finalized WAV header: riff={} data={}",
            header.riff_size, header.data_size
        );
        Ok(())
    }

    /// Total PCM bytes appended so far
    pub fn bytes_written(&self) -> u64 {
        self.header.running_total
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn target(&self) -> TargetFormat {
        self.target
    }

    /// Header as it currently stands (sentinel sizes until finalized)
    pub fn current_header(&self) -> WavHeader {
        WavHeader {
            riff_size: self.header.riff_size,
            data_size: self.header.data_size,
            ..WavHeader::finalized(self.target, 0)
        }
    }

    /// Recover the sink
    pub fn into_inner(self) -> W {
        self.sink
    }
}
