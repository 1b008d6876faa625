//! Audio processing: demuxing, decoding, sample conversion and WAV output

pub mod decoder;
pub mod demux;
pub mod resampler;
pub mod types;
pub mod wav;

pub use decoder::{drain, FrameDecoder, PcmDecoder, SymphoniaDecoder};
pub use demux::{Demuxer, MediaKind, RawWavDemuxer, StreamInfo, SymphoniaDemuxer};
pub use resampler::{ConverterOptions, FlushPolicy, SampleConverter};
pub use types::{
    ChannelLayout, ConvertedChunk, PacketBuffer, Packing, PcmFrame, SampleFormat,
    StreamDescriptor, TargetFormat,
};
pub use wav::{WavHeader, WavWriter, WriterState};
