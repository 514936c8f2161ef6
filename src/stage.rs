//! Contracts for the five pipeline collaborators.
//!
//! The pipeline never talks to FFmpeg directly. It drives a source reader,
//! a decoder, a filter graph, an encoder and a sink writer through the traits
//! below, and obtains all five from a [`Backend`]. The production backend
//! lives in [`crate::libav`]; anything else implementing these traits (an
//! in-memory mock, a hardware pipeline) can be driven the same way.
//!
//! Collaborator failures are reported as [`ffmpeg_next::Error`] values. The
//! lifecycle manager and the stages translate them into the matching
//! [`ShotError`](crate::ShotError) variant.

use std::path::Path;

use ffmpeg_next::{
    ChannelLayout, Error as FfmpegError, Rational, codec::Id,
    format::{Pixel, Sample},
};

use crate::config::SourceOptions;

/// Outcome of asking a collaborator for its next output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull<T> {
    /// An output item was produced.
    Ready(T),
    /// The collaborator needs more input before it can produce anything.
    NeedMoreInput,
    /// The collaborator has been flushed and will produce nothing more.
    EndOfStream,
}

/// Broad media type of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Video frames.
    Video,
    /// Audio samples.
    Audio,
    /// Subtitles, data, attachments and anything else.
    Other,
}

/// What the source reader reports about one of its streams after probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Index of the stream inside the input container.
    pub index: usize,
    /// Media type of the stream.
    pub kind: MediaKind,
    /// Codec carried by the stream.
    pub codec: Id,
    /// Time base the stream's timestamps are expressed in.
    pub time_base: Rational,
}

/// Picture layout of a video decoder or encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoFormat {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format of produced or accepted frames.
    pub pixel_format: Pixel,
    /// Sample (pixel) aspect ratio.
    pub aspect_ratio: Rational,
}

/// Sample layout of an audio decoder or encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Samples per second.
    pub sample_rate: u32,
    /// Sample format of produced or accepted frames.
    pub sample_format: Sample,
    /// Channel layout.
    pub channel_layout: ChannelLayout,
    /// Number of channels in the layout.
    pub channels: u16,
}

/// Media-specific part of [`CodecParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// Video layout.
    Video(VideoFormat),
    /// Audio layout.
    Audio(AudioFormat),
}

/// The parameters one stage exposes to the stages built after it.
///
/// The encoder is configured from the decoder's parameters, the filter graph
/// bridges the two, and the mux stage rescales timestamps between their time
/// bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// Frame or sample layout.
    pub format: StreamFormat,
    /// Time base of timestamps going in or coming out.
    pub time_base: Rational,
    /// Frame rate, when known (video only).
    pub frame_rate: Option<Rational>,
}

impl CodecParams {
    /// Media kind these parameters describe.
    pub fn kind(&self) -> MediaKind {
        match self.format {
            StreamFormat::Video(_) => MediaKind::Video,
            StreamFormat::Audio(_) => MediaKind::Audio,
        }
    }
}

/// A compressed, time-stamped unit of data (a packet).
pub trait CodedUnit {
    /// Index of the stream the unit belongs to.
    fn stream_index(&self) -> usize;

    /// Re-tag the unit with another stream index.
    fn set_stream_index(&mut self, index: usize);

    /// Convert the unit's timestamps from one time base to another.
    fn rescale_ts(&mut self, from: Rational, to: Rational);
}

/// A decoded or filtered frame travelling between stages.
pub trait StageFrame {
    /// Returns `true` if the frame can be reconstructed without reference to
    /// any other frame.
    fn is_key(&self) -> bool;

    /// The decoder's best guess of the frame's presentation time.
    fn best_effort_timestamp(&self) -> Option<i64>;

    /// Overwrite the presentation timestamp.
    fn set_pts(&mut self, pts: Option<i64>);

    /// Drop the picture-type classification (I/P/B) carried by the frame.
    fn clear_picture_type(&mut self);
}

/// Demultiplexer yielding per-stream coded units.
pub trait MediaSource {
    /// Coded unit type produced by this source.
    type Unit: CodedUnit;

    /// Streams found when the input was probed, in container order.
    fn streams(&self) -> Vec<StreamInfo>;

    /// Read the next coded unit, or `None` once the input is exhausted.
    fn read_unit(&mut self) -> Result<Option<Self::Unit>, FfmpegError>;
}

/// Decoder turning coded units into frames.
pub trait MediaDecoder {
    /// Coded unit type accepted by this decoder.
    type Unit;
    /// Frame type produced by this decoder.
    type Frame: StageFrame;

    /// Output parameters of the opened decoder.
    fn params(&self) -> &CodecParams;

    /// Feed one coded unit.
    fn submit(&mut self, unit: &Self::Unit) -> Result<(), FfmpegError>;

    /// Request the next decoded frame.
    fn receive_frame(&mut self) -> Result<Pull<Self::Frame>, FfmpegError>;
}

/// Filter graph between decoder output and encoder input.
pub trait FrameFilter {
    /// Frame type going in and out of the graph.
    type Frame;

    /// Push one frame into the graph's source node.
    fn submit(&mut self, frame: &Self::Frame) -> Result<(), FfmpegError>;

    /// Pull the next filtered frame from the graph's sink node.
    fn receive(&mut self) -> Result<Pull<Self::Frame>, FfmpegError>;
}

/// Encoder turning frames into coded units.
pub trait MediaEncoder {
    /// Frame type accepted by this encoder.
    type Frame;
    /// Coded unit type produced by this encoder.
    type Unit;

    /// Input parameters of the opened encoder.
    fn params(&self) -> &CodecParams;

    /// Feed one frame.
    fn submit(&mut self, frame: &Self::Frame) -> Result<(), FfmpegError>;

    /// Request the next coded unit.
    fn receive_unit(&mut self) -> Result<Pull<Self::Unit>, FfmpegError>;

    /// Ask the encoder to emit codec headers out of band, for containers
    /// that store them globally.
    fn request_global_header(&mut self);
}

/// Multiplexer packaging coded units into the output container.
///
/// The container header is written when the sink is opened.
pub trait MediaSink {
    /// Coded unit type accepted by this sink.
    type Unit;

    /// Write one unit, letting the container interleave it.
    fn write_interleaved(&mut self, unit: Self::Unit) -> Result<(), FfmpegError>;

    /// Finalize the container.
    fn write_trailer(&mut self) -> Result<(), FfmpegError>;

    /// Release the underlying output I/O ahead of the container itself.
    fn close_io(&mut self) {}
}

/// Factory for the five collaborators of one extraction.
///
/// The lifecycle manager calls the `open_*` methods in dependency order:
/// source, decoder, encoder, filter graph, sink.
pub trait Backend {
    /// Coded unit type flowing through the pipeline.
    type Unit: CodedUnit;
    /// Frame type flowing through the pipeline.
    type Frame: StageFrame;
    /// Source reader.
    type Source: MediaSource<Unit = Self::Unit>;
    /// Decoder.
    type Decoder: MediaDecoder<Unit = Self::Unit, Frame = Self::Frame>;
    /// Encoder.
    type Encoder: MediaEncoder<Unit = Self::Unit, Frame = Self::Frame>;
    /// Filter graph.
    type Filter: FrameFilter<Frame = Self::Frame>;
    /// Sink writer.
    type Sink: MediaSink<Unit = Self::Unit>;

    /// Open and probe the input.
    fn open_source(
        &mut self,
        locator: &str,
        options: &SourceOptions,
    ) -> Result<Self::Source, FfmpegError>;

    /// Open a decoder for one of the source's streams.
    fn open_decoder(
        &mut self,
        source: &Self::Source,
        stream: &StreamInfo,
    ) -> Result<Self::Decoder, FfmpegError>;

    /// Look an encoder up by name and configure it from the decoder.
    fn open_encoder(
        &mut self,
        name: &str,
        decoder: &CodecParams,
    ) -> Result<Self::Encoder, FfmpegError>;

    /// Build a filter graph from `spec`, fed with the decoder's output and
    /// constrained to the encoder's input.
    fn open_filter(
        &mut self,
        spec: &str,
        decoder: &CodecParams,
        encoder: &CodecParams,
    ) -> Result<Self::Filter, FfmpegError>;

    /// Create the output container with one stream copied from the encoder
    /// and write its header.
    fn open_sink(
        &mut self,
        locator: &Path,
        encoder: &mut Self::Encoder,
    ) -> Result<Self::Sink, FfmpegError>;
}
